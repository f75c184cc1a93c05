//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Rconix Source RCON Packet Codec
//!
//! This crate implements the packet framing of the Source RCON protocol for
//! use with Tokio's `Framed`, `FramedRead` and `FramedWrite`.
//!
//! ## Wire Layout
//!
//! Every packet is little-endian and length prefixed:
//!
//! ```text
//! +-----------+-------------+-----------+-------------+------+------+
//! | size: i32 | request id  | type: i32 | body (UTF-8)| 0x00 | 0x00 |
//! +-----------+-------------+-----------+-------------+------+------+
//!             |<------------------------ size ------------------->|
//! ```
//!
//! `size` counts everything after itself, so an empty body gives a size of
//! 10. Bodies are capped at [`consts::MAX_BODY_SIZE`] bytes; a size prefix
//! above the matching ceiling is rejected before the body is read.
//!
//! ## Packet Types
//!
//! | Value | Client to server | Server to client |
//! |-------|------------------|------------------|
//! | 3     | `AUTH`           |                  |
//! | 2     | `EXECCOMMAND`    | `AUTH_RESPONSE`  |
//! | 0     |                  | `RESPONSE_VALUE` |
//!
//! The codec never interprets the type field. A receiver decides what a type
//! `2` packet means from the direction and state of its connection.
//!
//! ## Usage Example
//!
//! ```rust
//! use rconix_rconcodec::{Packet, RconCodec};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! # fn example() -> Result<(), rconix_rconcodec::CodecError> {
//! let mut codec = RconCodec::new();
//!
//! let mut buffer = BytesMut::new();
//! codec.encode(Packet::auth(1, "hunter2"), &mut buffer)?;
//! codec.encode(Packet::exec_command(2, "list"), &mut buffer)?;
//!
//! while let Some(packet) = codec.decode(&mut buffer)? {
//!     println!("id={} type={} body={:?}", packet.id, packet.kind, packet.body);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

mod codec;
pub mod consts;
mod packet;
mod result;

pub use self::codec::{RconCodec, try_decode};
pub use self::packet::Packet;
pub use self::result::{CodecError, CodecResult};
