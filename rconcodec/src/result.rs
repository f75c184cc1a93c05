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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while framing RCON packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    ///
    /// Contains the error kind and a description of what operation failed.
    #[error("I/O error during {operation}: {kind:?}")]
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// The `size` prefix is negative or smaller than an empty packet.
    #[error("invalid packet size {size}")]
    InvalidSize {
        /// The size value read from the wire
        size: i32,
    },

    /// The `size` prefix announces more bytes than the protocol allows.
    #[error("packet size {size} exceeds maximum of {max}")]
    PacketTooLarge {
        /// The size value read from the wire
        size: i32,
        /// The largest accepted size
        max: usize,
    },

    /// A body does not fit in one packet.
    #[error("packet body of {len} bytes exceeds maximum of {max}")]
    BodyTooLarge {
        /// Body length in bytes
        len: usize,
        /// The largest accepted body length
        max: usize,
    },

    /// The frame payload holds no NUL byte to end the body.
    #[error("packet body is not NUL terminated")]
    MissingTerminator,

    /// A body contains a NUL byte, or bytes follow its terminator.
    #[error("packet body contains an embedded NUL byte")]
    EmbeddedNull,

    /// The body is not valid UTF-8.
    #[error("packet body is not valid UTF-8")]
    InvalidUtf8,
}

impl CodecError {
    /// Whether the length prefix itself was unusable.
    ///
    /// Framing errors leave the stream with no known packet boundary. Any
    /// other decode error concerns a frame whose extent was known, so the
    /// peer at least spoke the framing correctly.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidSize { .. } | CodecError::PacketTooLarge { .. }
        )
    }

    /// Whether the error came from the transport rather than the bytes.
    pub fn is_io_error(&self) -> bool {
        matches!(self, CodecError::IOError { .. })
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}
