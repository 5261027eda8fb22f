//! Top-level chunk container
//!
//! After the file header a replay is a flat run of chunks:
//!
//! | Field   | Type |
//! |---------|------|
//! | type    | u32  |
//! | size    | i32  |
//! | payload | size |
//!
//! [`ChunkReader`] walks them in file order without interpreting payloads.

use serde::Serialize;

use crate::compression::{CompressedBlock, CompressionMethod};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::events::EventRecord;
use crate::header::ReplayHeader;

/// Chunk type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChunkType {
    Header,
    ReplayData,
    Checkpoint,
    Event,
    Unknown(u32),
}

impl From<u32> for ChunkType {
    fn from(value: u32) -> Self {
        match value {
            0 => ChunkType::Header,
            1 => ChunkType::ReplayData,
            2 => ChunkType::Checkpoint,
            3 => ChunkType::Event,
            other => ChunkType::Unknown(other),
        }
    }
}

impl ChunkType {
    pub fn id(&self) -> u32 {
        match self {
            ChunkType::Header => 0,
            ChunkType::ReplayData => 1,
            ChunkType::Checkpoint => 2,
            ChunkType::Event => 3,
            ChunkType::Unknown(id) => *id,
        }
    }
}

/// A chunk borrowed from the input buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub chunk_type: ChunkType,
    /// Offset of the chunk's type tag in the file
    pub offset: usize,
    pub payload: &'a [u8],
}

impl Chunk<'_> {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectHeader,
    ReadingChunks,
    Done,
}

/// Sequential reader over the replay container
///
/// Call [`ChunkReader::read_header`] first, then iterate. Iteration yields
/// each chunk in file order and stops after the first error, so an `Err`
/// is always the last item.
pub struct ChunkReader<'a> {
    cursor: ByteCursor<'a>,
    state: State,
    max_chunks: Option<usize>,
    max_bytes: Option<usize>,
    chunks_read: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            state: State::ExpectHeader,
            max_chunks: None,
            max_bytes: None,
            chunks_read: 0,
        }
    }

    /// Stop after this many chunks
    pub fn with_max_chunks(mut self, max_chunks: Option<usize>) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Stop before any chunk that would end past this file offset
    pub fn with_max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Read the file header; any failure is [`Error::InvalidFormat`]
    pub fn read_header(&mut self) -> Result<ReplayHeader> {
        if self.state != State::ExpectHeader {
            return Err(Error::InvalidFormat(
                "file header was already read".to_string(),
            ));
        }
        match ReplayHeader::parse(&mut self.cursor) {
            Ok(header) => {
                self.state = State::ReadingChunks;
                Ok(header)
            }
            Err(e) => {
                self.state = State::Done;
                Err(e)
            }
        }
    }

    /// File offset of the next chunk
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn read_chunk(&mut self) -> Result<Chunk<'a>> {
        if let Some(max) = self.max_chunks {
            if self.chunks_read >= max {
                return Err(Error::LimitExceeded(format!(
                    "stopped after {} chunks",
                    max
                )));
            }
        }

        let offset = self.cursor.position();
        let chunk_type = ChunkType::from(self.cursor.read_u32()?);
        let size = self.cursor.read_i32()?;
        if size < 0 {
            return Err(Error::CorruptChunk(format!(
                "negative chunk size {} at offset {}",
                size, offset
            )));
        }
        let size = size as usize;

        if let Some(max) = self.max_bytes {
            let end = self.cursor.position().saturating_add(size);
            if end > max {
                return Err(Error::LimitExceeded(format!(
                    "chunk at offset {} ends at byte {}, limit is {}",
                    offset, end, max
                )));
            }
        }

        let payload = self.cursor.read_slice(size)?;
        self.chunks_read += 1;
        Ok(Chunk {
            chunk_type,
            offset,
            payload,
        })
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Done => None,
            State::ExpectHeader => {
                self.state = State::Done;
                Some(Err(Error::InvalidFormat(
                    "chunks requested before the file header was read".to_string(),
                )))
            }
            State::ReadingChunks => {
                if self.cursor.is_at_end() {
                    self.state = State::Done;
                    return None;
                }
                let result = self.read_chunk();
                if result.is_err() {
                    self.state = State::Done;
                }
                Some(result)
            }
        }
    }
}

/// Summary of a replay-data chunk; its contents are not interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataChunkInfo {
    pub offset: usize,
    /// Present when the file records stream chunk times
    pub start_ms: Option<u32>,
    pub end_ms: Option<u32>,
    pub memory_size: Option<u32>,
    pub compression: Option<CompressionMethod>,
    /// Size of the body once decompressed
    pub size: usize,
}

impl DataChunkInfo {
    /// Parse a replay-data chunk, decompressing its body when the replay is
    /// compressed so that a damaged stream is detected
    pub fn parse(chunk: &Chunk<'_>, header: &ReplayHeader) -> Result<Self> {
        let mut cursor = ByteCursor::new(chunk.payload);

        let (start_ms, end_ms, memory_size, body) = if header.has_chunk_times() {
            let start = cursor.read_u32()?;
            let end = cursor.read_u32()?;
            let length = cursor.read_u32()? as usize;
            let memory_size = cursor.read_u32()?;
            let body = cursor.read_slice(length)?;
            if !cursor.is_at_end() {
                return Err(Error::CorruptChunk(format!(
                    "{} trailing bytes after replay data at offset {}",
                    cursor.remaining(),
                    chunk.offset
                )));
            }
            (Some(start), Some(end), Some(memory_size), body)
        } else {
            (None, None, None, chunk.payload)
        };

        let (compression, size) = if header.is_compressed() {
            let block = CompressedBlock::parse(body)?;
            let decompressed = block.decompress()?;
            (Some(block.method), decompressed.len())
        } else {
            (None, body.len())
        };

        Ok(Self {
            offset: chunk.offset,
            start_ms,
            end_ms,
            memory_size,
            compression,
            size,
        })
    }
}

/// A framed record from a checkpoint chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointInfo {
    pub id: String,
    pub group: String,
    pub metadata: String,
    pub start_ms: u32,
    pub end_ms: u32,
    pub size: usize,
}

impl From<&EventRecord<'_>> for CheckpointInfo {
    fn from(record: &EventRecord<'_>) -> Self {
        Self {
            id: record.id.clone(),
            group: record.group.clone(),
            metadata: record.metadata.clone(),
            start_ms: record.start_ms,
            end_ms: record.end_ms,
            size: record.payload.len(),
        }
    }
}
