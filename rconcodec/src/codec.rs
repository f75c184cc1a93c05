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

use super::{CodecError, CodecResult, Packet, consts};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Attempts to parse one packet from the front of `src`.
///
/// # Returns
/// - `Ok(Some((packet, consumed)))`: a complete packet was found; the caller
///   drops `consumed` bytes from its buffer.
/// - `Ok(None)`: the buffer holds only part of a packet.
/// - `Err(CodecError)`: the buffered bytes can never form a valid packet.
///
/// The size prefix is checked as soon as it is available, so an oversized
/// packet is rejected before its body arrives.
pub fn try_decode(src: &[u8]) -> CodecResult<Option<(Packet, usize)>> {
    if src.len() < consts::SIZE_FIELD_LEN {
        return Ok(None);
    }

    let mut header = &src[..consts::SIZE_FIELD_LEN];
    let size = header.get_i32_le();
    if size < 0 || (size as usize) < consts::MIN_PACKET_SIZE {
        return Err(CodecError::InvalidSize { size });
    }
    if size as usize > consts::MAX_PACKET_SIZE {
        return Err(CodecError::PacketTooLarge {
            size,
            max: consts::MAX_PACKET_SIZE,
        });
    }

    let frame_len = consts::SIZE_FIELD_LEN + size as usize;
    if src.len() < frame_len {
        return Ok(None);
    }

    let mut frame = &src[consts::SIZE_FIELD_LEN..frame_len];
    let id = frame.get_i32_le();
    let kind = frame.get_i32_le();

    // The body runs up to its NUL terminator. At most one NUL pad byte follows.
    let end = frame
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::MissingTerminator)?;
    if end > consts::MAX_BODY_SIZE {
        return Err(CodecError::BodyTooLarge {
            len: end,
            max: consts::MAX_BODY_SIZE,
        });
    }
    match &frame[end + 1..] {
        [] | [0] => {}
        _ => return Err(CodecError::EmbeddedNull),
    }
    let body = std::str::from_utf8(&frame[..end])
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_string();

    Ok(Some((Packet { id, kind, body }, frame_len)))
}

/// A codec for framing Source RCON packets over a byte stream.
///
/// `RconCodec` is stateless: every call to [`Decoder::decode`] re-reads the
/// size prefix at the front of the buffer, so a packet may arrive split across
/// any number of reads and several packets may arrive in one read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RconCodec;

impl RconCodec {
    /// Creates a new instance of `RconCodec`.
    ///
    /// # Example
    /// ```
    /// use rconix_rconcodec::RconCodec;
    ///
    /// let codec = RconCodec::new();
    /// ```
    pub fn new() -> RconCodec {
        RconCodec
    }
}

impl Decoder for RconCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, Self::Error> {
        match try_decode(src)? {
            Some((packet, consumed)) => {
                src.advance(consumed);
                trace!(
                    id = packet.id,
                    kind = packet.kind,
                    len = packet.body.len(),
                    "Decoded RCON packet"
                );
                Ok(Some(packet))
            }
            None => {
                if src.len() >= consts::SIZE_FIELD_LEN {
                    // Size is known and valid; make room for the rest of the frame.
                    let size = (&src[..consts::SIZE_FIELD_LEN]).get_i32_le() as usize;
                    src.reserve(consts::SIZE_FIELD_LEN + size - src.len());
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Packet> for RconCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst)
    }
}

impl Encoder<&Packet> for RconCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst)
    }
}
