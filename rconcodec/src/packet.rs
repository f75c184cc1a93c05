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

use crate::{CodecError, CodecResult, consts};
use bytes::{BufMut, Bytes, BytesMut};

/// A single Source RCON packet.
///
/// The packet type is kept as the raw wire value. Type `2` means
/// `EXECCOMMAND` when sent by a client and `AUTH_RESPONSE` when sent by a
/// server, so only the receiver's connection state can name it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Packet {
    /// Client chosen request id, echoed by the server.
    pub id: i32,
    /// Raw packet type.
    pub kind: i32,
    /// Text body, without its NUL terminator.
    pub body: String,
}

impl Packet {
    /// Creates a packet from its three wire fields.
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// `SERVERDATA_AUTH` carrying a password.
    pub fn auth(id: i32, password: impl Into<String>) -> Self {
        Self::new(id, consts::SERVERDATA_AUTH, password)
    }

    /// `SERVERDATA_EXECCOMMAND` carrying a command line.
    pub fn exec_command(id: i32, command: impl Into<String>) -> Self {
        Self::new(id, consts::SERVERDATA_EXECCOMMAND, command)
    }

    /// Successful `SERVERDATA_AUTH_RESPONSE` echoing the AUTH request id.
    pub fn auth_response(id: i32) -> Self {
        Self::new(id, consts::SERVERDATA_AUTH_RESPONSE, String::new())
    }

    /// Failed `SERVERDATA_AUTH_RESPONSE`.
    pub fn auth_failure() -> Self {
        Self::auth_response(consts::AUTH_FAILURE_ID)
    }

    /// `SERVERDATA_RESPONSE_VALUE` carrying command output.
    pub fn response_value(id: i32, body: impl Into<String>) -> Self {
        Self::new(id, consts::SERVERDATA_RESPONSE_VALUE, body)
    }

    /// Value of the `size` field for this packet.
    pub fn wire_size(&self) -> usize {
        consts::PACKET_OVERHEAD + self.body.len()
    }

    /// Total number of bytes this packet occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        consts::SIZE_FIELD_LEN + self.wire_size()
    }

    /// Checks that the packet can be represented on the wire.
    pub fn validate(&self) -> CodecResult<()> {
        if self.body.len() > consts::MAX_BODY_SIZE {
            return Err(CodecError::BodyTooLarge {
                len: self.body.len(),
                max: consts::MAX_BODY_SIZE,
            });
        }
        if self.body.as_bytes().contains(&0) {
            return Err(CodecError::EmbeddedNull);
        }
        Ok(())
    }

    /// Appends the wire form of this packet to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> CodecResult<()> {
        self.validate()?;
        dst.reserve(self.encoded_len());
        // Bounded by MAX_PACKET_SIZE, so the cast cannot truncate.
        dst.put_i32_le(self.wire_size() as i32);
        dst.put_i32_le(self.id);
        dst.put_i32_le(self.kind);
        dst.put_slice(self.body.as_bytes());
        dst.put_u8(0);
        dst.put_u8(0);
        Ok(())
    }

    /// Returns the wire form of this packet.
    pub fn to_bytes(&self) -> CodecResult<Bytes> {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut dst)?;
        Ok(dst.freeze())
    }
}
