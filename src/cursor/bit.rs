//! Bit-granular reader for bit-packed event payloads
//!
//! Bits are consumed LSB-first within each byte and bytes in ascending
//! order, which is how Unreal's `FBitReader` lays out serialized values.
//! A value of `n` bits therefore has its least significant bit at the
//! current position.

use super::{decode_fstring, fstring_byte_len};
use crate::error::{Error, Result};

/// Bit reader over a byte buffer, optionally bounded to a sub-range
///
/// A cursor created with [`BitCursor::new`] fails with
/// [`Error::TruncatedInput`] when it runs off the buffer. A cursor returned
/// by [`BitCursor::with_limit`] fails with [`Error::BoundsExceeded`] when a
/// read would cross its limit, so a corrupt length field inside one record
/// can never pull bits out of the next one.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    /// Absolute bit position in `data`
    pos: usize,
    /// Absolute bit position one past the last readable bit
    end: usize,
    bounded: bool,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len() * 8,
            bounded: false,
        }
    }

    /// Bits consumed since the start of this cursor's buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining_bits(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.end
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn require(&self, bits: usize) -> Result<()> {
        let available = self.remaining_bits();
        if bits <= available {
            return Ok(());
        }
        if self.bounded {
            Err(Error::BoundsExceeded {
                requested: bits,
                available,
            })
        } else {
            Err(Error::TruncatedInput {
                offset: self.pos / 8,
                needed: bits.div_ceil(8),
                available: available / 8,
            })
        }
    }

    /// Read `n` bits (0..=64) as an unsigned integer
    pub fn read_bits(&mut self, n: usize) -> Result<u64> {
        if n > 64 {
            return Err(Error::BoundsExceeded {
                requested: n,
                available: 64,
            });
        }
        self.require(n)?;

        let mut value = 0u64;
        let mut filled = 0;
        while filled < n {
            let byte = self.data[self.pos / 8];
            let offset = self.pos % 8;
            let take = (8 - offset).min(n - filled);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> offset) & mask;
            value |= (bits as u64) << filled;
            filled += take;
            self.pos += take;
        }
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_bits(64)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a 32-bit boolean
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u32()? == 1)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.require(len.saturating_mul(8))?;
        if self.is_aligned() {
            let start = self.pos / 8;
            self.pos += len * 8;
            return Ok(self.data[start..start + len].to_vec());
        }
        (0..len).map(|_| self.read_u8()).collect()
    }

    /// Read a length-prefixed Unreal `FString`
    pub fn read_fstring(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        if len == 0 {
            return Ok(String::new());
        }
        let (byte_len, utf16) = fstring_byte_len(len);
        let bytes = self.read_bytes(byte_len)?;
        Ok(decode_fstring(&bytes, utf16))
    }

    /// Read an Unreal packed integer (7 bits per byte, continuation in bit 0)
    pub fn read_packed_int(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for group in 0..5 {
            let byte = self.read_u8()?;
            value |= ((byte >> 1) as u32) << (7 * group);
            if byte & 1 == 0 {
                return Ok(value);
            }
        }
        Err(Error::CorruptChunk(
            "packed integer exceeds 5 bytes".to_string(),
        ))
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn skip_bytes(&mut self, n: usize) -> Result<()> {
        self.skip_bits(n.saturating_mul(8))
    }

    /// Round the position up to the next byte boundary, never past the end
    pub fn align(&mut self) {
        self.pos = self.pos.next_multiple_of(8).min(self.end);
    }

    /// Split off the next `bits` bits as a bounded sub-cursor
    ///
    /// The returned cursor starts at the current position and cannot read
    /// beyond `bits`; this cursor advances past the whole range regardless
    /// of how much the sub-cursor ends up consuming.
    pub fn with_limit(&mut self, bits: usize) -> Result<BitCursor<'a>> {
        self.require(bits)?;
        let sub = BitCursor {
            data: self.data,
            pos: self.pos,
            end: self.pos + bits,
            bounded: true,
        };
        self.pos += bits;
        Ok(sub)
    }
}
