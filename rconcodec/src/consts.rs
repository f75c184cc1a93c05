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

//! Source RCON wire constants

/// Client to server: credential packet carrying the password as its body.
pub const SERVERDATA_AUTH: i32 = 3;

/// Server to client: result of an AUTH attempt. The request id is `-1` on failure.
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;

/// Client to server: command line to execute.
///
/// Shares its numeric value with [`SERVERDATA_AUTH_RESPONSE`]. Only the
/// connection's authentication state tells the two apart.
pub const SERVERDATA_EXECCOMMAND: i32 = 2;

/// Server to client: command output.
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Request id sent in an `AUTH_RESPONSE` to signal a rejected password.
pub const AUTH_FAILURE_ID: i32 = -1;

/// Largest body, in bytes, a single packet may carry.
pub const MAX_BODY_SIZE: usize = 4096;

/// Width of the little-endian `size` prefix.
pub const SIZE_FIELD_LEN: usize = 4;

/// Bytes counted by `size` that are not body: request id, type, and the two NUL terminators.
pub const PACKET_OVERHEAD: usize = 10;

/// Smallest legal value of the `size` field (an empty body).
pub const MIN_PACKET_SIZE: usize = PACKET_OVERHEAD;

/// Largest legal value of the `size` field.
pub const MAX_PACKET_SIZE: usize = PACKET_OVERHEAD + MAX_BODY_SIZE;
