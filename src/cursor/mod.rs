//! Byte and bit cursors over an in-memory replay buffer
//!
//! Every multi-byte value in a replay file is little endian. [`ByteCursor`]
//! handles the byte-aligned container (file header, chunk framing, event
//! framing) and [`BitCursor`] the bit-packed event payloads.

mod bit;
mod byte;

pub use bit::BitCursor;
pub use byte::ByteCursor;

/// Decode an Unreal `FString` body once its length prefix has been read.
///
/// Positive lengths are single-byte strings including a trailing NUL,
/// negative lengths are UTF-16LE with `-len` code units (NUL included).
pub(crate) fn decode_fstring(bytes: &[u8], utf16: bool) -> String {
    if utf16 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let trimmed = match units.last() {
            Some(0) => &units[..units.len() - 1],
            _ => &units[..],
        };
        return String::from_utf16_lossy(trimmed);
    }

    let trimmed = match bytes.last() {
        Some(0) => &bytes[..bytes.len() - 1],
        _ => bytes,
    };
    match std::str::from_utf8(trimmed) {
        Ok(s) => s.to_string(),
        // Latin-1: every byte maps to the code point of the same value
        Err(_) => trimmed.iter().map(|&b| b as char).collect(),
    }
}

/// Byte length of an `FString` body for a given length prefix
pub(crate) fn fstring_byte_len(len: i32) -> (usize, bool) {
    if len < 0 {
        (len.unsigned_abs() as usize * 2, true)
    } else {
        (len as usize, false)
    }
}
