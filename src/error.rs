//! Error types for fnreplay

use thiserror::Error;

/// Main error type for replay decoding
///
/// Only [`Error::InvalidFormat`] (and I/O failures while reading the source)
/// ever escape [`crate::parse`]; every other variant is recovered inside the
/// engine and surfaces as a [`crate::Diagnostics`] counter instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid replay file: {0}")]
    InvalidFormat(String),

    #[error("Truncated input: needed {needed} more bytes at offset {offset}, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Read of {requested} bits crosses record boundary ({available} bits left)")]
    BoundsExceeded { requested: usize, available: usize },

    #[error("Corrupt chunk: {0}")]
    CorruptChunk(String),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u32),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Parse limit exceeded: {0}")]
    LimitExceeded(String),
}

/// Result type alias for replay operations
pub type Result<T> = std::result::Result<T, Error>;
