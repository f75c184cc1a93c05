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

//! Source RCON Server Implementation
//!
//! This crate embeds a Source RCON remote console into a host process. The
//! host keeps its own main loop and supplies two things:
//!
//! - a [`CommandExecutor`] that turns a command line into response text, and
//! - a [`HostScheduler`] that runs a task on the host thread.
//!
//! The server runs on one dedicated serving thread. Every client session is
//! multiplexed on that thread, and each authenticated command is handed to
//! the host through the scheduler, one command at a time for the whole
//! server.
//!
//! # Architecture
//!
//! ```text
//! RconServer (lifecycle, serving thread)
//!     ↓
//! Listener (accept, connection cap, multiplexed reads)
//!     ↓                         ↓
//! Session (auth state)     CommandBridge → HostScheduler → CommandExecutor
//!     ↓
//! RconCodec
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rconix_service::{HostQueue, RconServer, ServerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut queue = HostQueue::new();
//!     let server = RconServer::start(
//!         ServerConfig::new("0.0.0.0:25575".parse()?, "hunter2"),
//!         |command: &str| format!("unknown command: {command}"),
//!         queue.scheduler(),
//!     )?;
//!
//!     for _ in 0..1200 {
//!         // The host's own work for this tick goes here.
//!         queue.run_pending();
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//!
//!     server.stop();
//!     Ok(())
//! }
//! ```

mod bridge;
mod config;
mod error;
mod host;
mod listener;
mod server;
mod session;
mod types;

pub use bridge::{CommandExecutor, HostScheduler, HostTask, clean_response};
pub use config::{DEFAULT_PORT, MIN_BACKLOG, ServerConfig};
pub use error::{RconError, Result};
pub use host::{HostQueue, QueueScheduler};
pub use server::{RconServer, SERVING_THREAD_NAME};
pub use session::split_response;
pub use types::{ConnectionId, SessionState};

pub use rconix_rconcodec::{CodecError, Packet};
