//! Chunk payload decompression
//!
//! Compressed replays wrap each replay-data body in a small envelope:
//!
//! | Field             | Type            |
//! |-------------------|-----------------|
//! | method            | u32             |
//! | decompressed size | u32             |
//! | compressed size   | u32             |
//! | data              | compressed size |
//!
//! Method ids: None (0), Deflate (1), Zlib (2), Zstd (3), Oodle (4).
//! Oodle is what shipping builds use; it has no open implementation so it is
//! recognised but reported as unsupported.

use std::io::Read;

use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Upper bound on the buffer reserved up front from an envelope's declared size
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Compression methods that may appear in a chunk envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompressionMethod {
    /// Stored as-is
    None,
    /// Raw DEFLATE stream
    Deflate,
    /// DEFLATE with zlib framing
    Zlib,
    /// ZStandard
    Zstd,
    /// Oodle (recognised, not decodable)
    Oodle,
    /// Unknown/unsupported method
    Unknown(u32),
}

impl From<u32> for CompressionMethod {
    fn from(value: u32) -> Self {
        match value {
            0 => CompressionMethod::None,
            1 => CompressionMethod::Deflate,
            2 => CompressionMethod::Zlib,
            3 => CompressionMethod::Zstd,
            4 => CompressionMethod::Oodle,
            other => CompressionMethod::Unknown(other),
        }
    }
}

impl CompressionMethod {
    /// Wire identifier of this method
    pub fn id(&self) -> u32 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Deflate => 1,
            CompressionMethod::Zlib => 2,
            CompressionMethod::Zstd => 3,
            CompressionMethod::Oodle => 4,
            CompressionMethod::Unknown(id) => *id,
        }
    }
}

/// A compressed body split into its envelope fields
#[derive(Debug, Clone)]
pub struct CompressedBlock<'a> {
    pub method: CompressionMethod,
    pub decompressed_size: usize,
    pub data: &'a [u8],
}

impl<'a> CompressedBlock<'a> {
    /// Parse an envelope that must fill `body` exactly
    pub fn parse(body: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(body);
        let method = CompressionMethod::from(cursor.read_u32()?);
        let decompressed_size = cursor.read_u32()? as usize;
        let compressed_size = cursor.read_u32()? as usize;

        if compressed_size != cursor.remaining() {
            return Err(Error::CorruptChunk(format!(
                "compressed size {} does not match the {} bytes left in the chunk",
                compressed_size,
                cursor.remaining()
            )));
        }

        Ok(Self {
            method,
            decompressed_size,
            data: cursor.read_slice(compressed_size)?,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        decompress(self.method, self.data, self.decompressed_size)
    }
}

/// Decompress `data`, which must expand to exactly `expected_size` bytes
pub fn decompress(method: CompressionMethod, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let decompressed = match method {
        CompressionMethod::None => data.to_vec(),

        CompressionMethod::Deflate => {
            use flate2::read::DeflateDecoder;
            read_capped(DeflateDecoder::new(data), expected_size)
                .map_err(|e| Error::Decompression(format!("Deflate error: {}", e)))?
        }

        CompressionMethod::Zlib => {
            use flate2::read::ZlibDecoder;
            read_capped(ZlibDecoder::new(data), expected_size)
                .map_err(|e| Error::Decompression(format!("Zlib error: {}", e)))?
        }

        CompressionMethod::Zstd => {
            let decoder = zstd::stream::Decoder::new(data)
                .map_err(|e| Error::Decompression(format!("ZSTD init error: {}", e)))?;
            read_capped(decoder, expected_size)
                .map_err(|e| Error::Decompression(format!("ZSTD error: {}", e)))?
        }

        CompressionMethod::Oodle | CompressionMethod::Unknown(_) => {
            return Err(Error::UnsupportedCompression(method.id()));
        }
    };

    if decompressed.len() != expected_size {
        return Err(Error::CorruptChunk(format!(
            "decompressed to {} bytes, header declared {}",
            decompressed.len(),
            expected_size
        )));
    }

    Ok(decompressed)
}

/// Read at most one byte more than expected so an oversized stream is
/// detected without inflating all of it
fn read_capped<R: Read>(reader: R, expected_size: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size.min(MAX_PREALLOC));
    reader
        .take(expected_size as u64 + 1)
        .read_to_end(&mut out)?;
    Ok(out)
}
