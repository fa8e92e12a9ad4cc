//! Update chunk framing: validation of received data frames, the ACK/NACK
//! replies and the host-side chunk builder.
//!
//! A chunk carries up to seven image bytes followed by one check byte. The
//! whole payload, zero-padded to eight bytes, must reduce to zero under the
//! CRC-8 of [`crate::infra::crc`].
use crate::error::ChunkError;
use crate::infra::crc::{check_byte, chunk_word, crc8};
use crate::protocol::transport::frame::Frame;

/// Payload of an acknowledgement.
pub const ACK: u8 = 0xFF;
/// First byte of a negative acknowledgement.
pub const NACK: u8 = 0x00;
/// Image bytes one chunk can carry.
pub const MAX_CHUNK_DATA: usize = 7;

/// Check a received chunk and return its image bytes (check byte stripped).
pub fn validate_chunk(frame: &Frame) -> Result<&[u8], ChunkError> {
    let payload = frame.payload();
    let Some((_, data)) = payload.split_last() else {
        return Err(ChunkError::Empty);
    };
    match crc8(chunk_word(payload)) {
        0 => Ok(data),
        remainder => Err(ChunkError::Crc { remainder }),
    }
}

/// Single byte `0xFF` reply to an accepted chunk.
pub fn ack_frame(id: u32) -> Frame {
    let mut data = [0u8; 8];
    data[0] = ACK;
    Frame { id, dlc: 1, data }
}

/// Three byte reply to a rejected chunk: `0x00`, then the error count, low
/// byte first.
pub fn nack_frame(id: u32, error_count: u32) -> Frame {
    let count = (error_count as u16).to_le_bytes();
    let mut data = [0u8; 8];
    data[0] = NACK;
    data[1] = count[0];
    data[2] = count[1];
    Frame { id, dlc: 3, data }
}

/// Build a chunk frame carrying `data` and its check byte.
///
/// Returns `None` when `data` is longer than [`MAX_CHUNK_DATA`].
pub fn build_chunk_frame(id: u32, data: &[u8]) -> Option<Frame> {
    if data.len() > MAX_CHUNK_DATA {
        return None;
    }
    let mut payload = [0u8; 8];
    payload[..data.len()].copy_from_slice(data);
    payload[data.len()] = check_byte(data);
    Frame::with_payload(id, &payload[..=data.len()])
}
