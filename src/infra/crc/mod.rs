//! CRC-8/AUTOSAR-polynomial check used by update chunks.
//!
//! A chunk is validated as one 64-bit word: the frame payload, zero-padded to
//! eight bytes, read big-endian so that the first payload byte is the most
//! significant and the check byte of a full frame sits in the low-order byte.
//! The word is reduced modulo the 9-bit generator `0x12F`, most significant
//! bit first; a chunk is valid when nothing remains.
//!
//! Zero padding multiplies the word by a power of `x`, which the generator
//! does not divide, so short chunks validate the same way as full ones.

/// Generator polynomial, including the implicit `x^8` term.
pub const CRC8_POLYNOMIAL: u16 = 0x12F;

/// Reduces a 64-bit word modulo [`CRC8_POLYNOMIAL`] and returns the remainder.
pub const fn crc8(word: u64) -> u8 {
    let mut value = word;
    let mut bit = 63;
    while bit >= 8 {
        if value & (1u64 << bit) != 0 {
            value ^= (CRC8_POLYNOMIAL as u64) << (bit - 8);
        }
        bit -= 1;
    }
    (value & 0xFF) as u8
}

/// Builds the big-endian word of a payload, zero-padded to eight bytes.
///
/// Bytes past the eighth are ignored.
pub fn chunk_word(payload: &[u8]) -> u64 {
    let mut padded = [0u8; 8];
    let len = payload.len().min(8);
    padded[..len].copy_from_slice(&payload[..len]);
    u64::from_be_bytes(padded)
}

/// Computes the byte that, appended to `data` (at most seven bytes), makes
/// the padded word reduce to zero.
pub fn check_byte(data: &[u8]) -> u8 {
    let len = data.len().min(7);
    let value = data[..len]
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
    crc8(value << 8)
}

/// Returns `true` when the zero-padded payload reduces to zero.
pub fn is_valid_chunk(payload: &[u8]) -> bool {
    crc8(chunk_word(payload)) == 0
}
