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

//! Error types for the RCON server

use crate::types::ConnectionId;
use rconix_rconcodec::CodecError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, RconError>;

/// RCON server error types
#[derive(Debug, Error)]
pub enum RconError {
    /// Binding or listening on the configured address failed
    #[error("Failed to open main socket on {address}: {source}")]
    Bind {
        /// Address that was requested
        address: SocketAddr,
        /// Error reported by the operating system
        #[source]
        source: std::io::Error,
    },

    /// The serving thread or its runtime could not be created
    #[error("Failed to start serving thread: {0}")]
    Runtime(std::io::Error),

    /// The configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Protocol or transport error from the codec layer
    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// A client presented the wrong password or misused AUTH
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// A write to a client did not complete in time
    #[error("Write timed out")]
    WriteTimeout,

    /// The host dropped a command without answering it
    #[error("Command bridge closed before a response arrived")]
    BridgeClosed,

    /// Server is shutting down
    #[error("Server is shutting down")]
    ServerShuttingDown,
}

impl RconError {
    /// Check if the error prevents the server from starting
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            RconError::Bind { .. } | RconError::Runtime(_) | RconError::InvalidConfig(_)
        )
    }

    /// Check if the error only concerns a single connection
    ///
    /// Connection-local errors close the affected session and leave the
    /// server running.
    pub fn is_connection_local(&self) -> bool {
        matches!(
            self,
            RconError::Codec(_)
                | RconError::AuthenticationFailed
                | RconError::ConnectionNotFound(_)
                | RconError::ConnectionClosed
                | RconError::WriteTimeout
        )
    }
}
