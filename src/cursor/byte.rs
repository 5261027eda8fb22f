//! Byte-aligned reader used for the replay container and event framing

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use super::{decode_fstring, fstring_byte_len};
use crate::error::{Error, Result};

/// Longest encoding of a 32-bit packed integer (5 groups of 7 bits)
const MAX_PACKED_INT_BYTES: u32 = 5;

/// Bounds-checked forward reader over a byte buffer
///
/// Every read checks the remaining length first so that running off the
/// end yields [`Error::TruncatedInput`] carrying the offset, instead of an
/// opaque `UnexpectedEof`.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.inner.position() as usize
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn require(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(Error::TruncatedInput {
                offset: self.position(),
                needed,
                available,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.inner.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.require(4)?;
        Ok(self.inner.read_i32::<LittleEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.require(8)?;
        Ok(self.inner.read_u64::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.require(4)?;
        Ok(self.inner.read_f32::<LittleEndian>()?)
    }

    /// Read a 32-bit boolean (Unreal serializes `bool` as a full `u32`)
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u32()? == 1)
    }

    /// Borrow the next `len` bytes without copying
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let start = self.position();
        let data: &'a [u8] = *self.inner.get_ref();
        self.inner.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.require(len)?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.require(len)?;
        let pos = self.position();
        self.inner.set_position((pos + len) as u64);
        Ok(())
    }

    /// Read exactly `len` bytes as text, dropping a trailing NUL if present
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_slice(len)?;
        Ok(decode_fstring(bytes, false))
    }

    /// Read a length-prefixed Unreal `FString`
    pub fn read_fstring(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        if len == 0 {
            return Ok(String::new());
        }
        let (byte_len, utf16) = fstring_byte_len(len);
        let bytes = self.read_slice(byte_len)?;
        Ok(decode_fstring(bytes, utf16))
    }

    /// Read a 16-byte GUID
    pub fn read_guid(&mut self) -> Result<[u8; 16]> {
        let mut guid = [0u8; 16];
        guid.copy_from_slice(self.read_slice(16)?);
        Ok(guid)
    }

    /// Read an `i32`-counted byte array (`TArray<uint8>`)
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(Error::CorruptChunk(format!(
                "negative array length {} at offset {}",
                count,
                self.position() - 4
            )));
        }
        self.read_bytes(count as usize)
    }

    /// Read an Unreal packed integer: 7 bits per byte, continuation flag in bit 0
    pub fn read_packed_int(&mut self) -> Result<u32> {
        let start = self.position();
        let mut value: u32 = 0;
        for group in 0..MAX_PACKED_INT_BYTES {
            let byte = self.read_u8()?;
            value |= ((byte >> 1) as u32) << (7 * group);
            if byte & 1 == 0 {
                return Ok(value);
            }
        }
        Err(Error::CorruptChunk(format!(
            "packed integer at offset {} exceeds {} bytes",
            start, MAX_PACKED_INT_BYTES
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_reads_are_little_endian() {
        let data = [
            0x7F, 0xE2, 0xA2, 0x1C, // u32
            0x34, 0x12, // u16
            0xAB, // u8
            0x00, 0x00, 0x80, 0x3F, // f32 1.0
        ];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0x1CA2_E27F);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u8().unwrap(), 0xAB);
        assert_eq!(cursor.read_f32().unwrap(), 1.0);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        cursor.read_u8().unwrap();
        match cursor.read_u32() {
            Err(Error::TruncatedInput {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (1, 4, 2));
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        // A failed read leaves the position untouched
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_read_fstring() {
        let mut data = Vec::new();
        data.extend_from_slice(&6i32.to_le_bytes());
        data.extend_from_slice(b"Alice\0");
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&(-3i32).to_le_bytes());
        data.extend_from_slice(&[b'B', 0, b'o', 0, 0, 0]);

        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_fstring().unwrap(), "Alice");
        assert_eq!(cursor.read_fstring().unwrap(), "");
        assert_eq!(cursor.read_fstring().unwrap(), "Bo");
    }

    #[test]
    fn test_read_string() {
        let data = b"Tilted\0Towers..";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_string(7).unwrap(), "Tilted");
        assert_eq!(cursor.read_string(6).unwrap(), "Towers");
        assert_eq!(cursor.position(), 13);

        match cursor.read_string(5) {
            Err(Error::TruncatedInput {
                offset,
                needed,
                available,
            }) => assert_eq!((offset, needed, available), (13, 5, 2)),
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        assert_eq!(cursor.position(), 13);
        assert_eq!(cursor.read_string(2).unwrap(), "..");
    }

    #[test]
    fn test_fstring_length_past_end() {
        let mut data = Vec::new();
        data.extend_from_slice(&100i32.to_le_bytes());
        data.extend_from_slice(b"short\0");
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.read_fstring(),
            Err(Error::TruncatedInput { needed: 100, .. })
        ));
    }

    #[test]
    fn test_read_packed_int() {
        // 1 => 0b10, 300 => 0x2C<<1|1, 300>>7=2 => 0b100
        let mut cursor = ByteCursor::new(&[0x02, 0x59, 0x04]);
        assert_eq!(cursor.read_packed_int().unwrap(), 1);
        assert_eq!(cursor.read_packed_int().unwrap(), 300);
    }

    #[test]
    fn test_read_packed_int_too_long() {
        let mut cursor = ByteCursor::new(&[0xFF; 6]);
        assert!(matches!(
            cursor.read_packed_int(),
            Err(Error::CorruptChunk(_))
        ));
    }

    #[test]
    fn test_read_guid_and_skip() {
        let data: Vec<u8> = (0..20).collect();
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();
        let guid = cursor.read_guid().unwrap();
        assert_eq!(guid[0], 2);
        assert_eq!(guid[15], 17);
        assert_eq!(cursor.remaining(), 2);
        assert!(cursor.skip(3).is_err());
    }
}
