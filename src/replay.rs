//! Replay facade: header, chunk walk, event decoding and extraction
//!
//! Parsing is eager and runs in two passes over the in-memory buffer. The
//! first walks the container and collects borrowed chunks, so the Fortnite
//! header chunk is known before any event is decoded regardless of where it
//! sits in the file. The second decodes every chunk in file order.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;
use tracing::{debug, info};

use crate::chunk::{CheckpointInfo, Chunk, ChunkReader, ChunkType, DataChunkInfo};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::events::{self, Elimination, EventDecoder, MatchStats, TeamStats};
use crate::extract::Extractor;
use crate::header::{GameHeader, ReplayFlags, ReplayHeader};

/// Resource guards for untrusted input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Stop the chunk walk after this many chunks
    pub max_chunks: Option<usize>,
    /// Stop the chunk walk before any chunk ending past this file offset;
    /// also caps the declared size of a compressed body
    pub max_bytes: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

/// Everything decoded from one replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReplay {
    pub header: ReplayHeader,
    pub game_header: Option<GameHeader>,
    /// Ordered by timestamp, ties in file order
    pub eliminations: Vec<Elimination>,
    /// Latest stats snapshot of the recording player
    pub stats: Option<MatchStats>,
    pub team_stats: BTreeMap<u32, TeamStats>,
    pub checkpoints: Vec<CheckpointInfo>,
    pub data_chunks: Vec<DataChunkInfo>,
    pub diagnostics: Diagnostics,
}

impl ParsedReplay {
    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    pub fn game_header(&self) -> Option<&GameHeader> {
        self.game_header.as_ref()
    }

    pub fn eliminations(&self) -> &[Elimination] {
        &self.eliminations
    }

    pub fn stats(&self) -> Option<&MatchStats> {
        self.stats.as_ref()
    }

    pub fn team_stats(&self) -> &BTreeMap<u32, TeamStats> {
        &self.team_stats
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Read a replay from any byte source
///
/// The source is read to the end and then dropped; it is never retained
/// past this call, so passing `&mut File` leaves the file with the caller.
pub fn open<R: Read>(source: R) -> Result<ParsedReplay> {
    open_with_options(source, &ParseOptions::default())
}

pub fn open_with_options<R: Read>(mut source: R, options: &ParseOptions) -> Result<ParsedReplay> {
    let mut data = Vec::new();
    source.read_to_end(&mut data)?;
    parse_with_options(&data, options)
}

/// Parse a replay held in memory
pub fn parse(data: &[u8]) -> Result<ParsedReplay> {
    parse_with_options(data, &ParseOptions::default())
}

/// Parse a replay held in memory with resource guards
///
/// Fails only with [`Error::InvalidFormat`] when the file header cannot be
/// read. Every later problem is recovered and reported in
/// [`ParsedReplay::diagnostics`].
pub fn parse_with_options(data: &[u8], options: &ParseOptions) -> Result<ParsedReplay> {
    let mut reader = ChunkReader::new(data)
        .with_max_chunks(options.max_chunks)
        .with_max_bytes(options.max_bytes);
    let mut header = reader.read_header()?;
    let mut diagnostics = Diagnostics::default();

    debug!(
        "Replay header: version {}, network {}, {} ms, flags {:#x}",
        header.file_version,
        header.network_version,
        header.length_in_ms,
        header.flags.bits()
    );

    if header.is_encrypted() && header.encryption_key.is_empty() {
        diagnostics.warn("replay is encrypted but carries no key; event payloads stay undecoded");
    }

    let mut chunks = Vec::new();
    for item in reader {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => record_walk_end(e, &mut diagnostics),
        }
    }
    diagnostics.chunks = chunks.len();

    let game_header = find_game_header(&chunks, &mut diagnostics);
    if game_header.is_some() {
        header.flags.insert(ReplayFlags::HAS_GAME_DATA);
    }

    let decoder = EventDecoder::new(&header, game_header.as_ref());
    debug!("Elimination layout: {:?}", decoder.layout());

    let mut extractor = Extractor::new();
    let mut checkpoints = Vec::new();
    let mut data_chunks = Vec::new();

    for chunk in &chunks {
        match chunk.chunk_type {
            ChunkType::Header => {}
            ChunkType::ReplayData => match parse_data_chunk(chunk, &header, options) {
                Ok(info) => data_chunks.push(info),
                Err(e) => {
                    diagnostics.skipped_chunks += 1;
                    diagnostics.warn(format!(
                        "replay data chunk at offset {} skipped: {}",
                        chunk.offset, e
                    ));
                }
            },
            ChunkType::Event | ChunkType::Checkpoint => {
                let (records, error) = events::read_records(chunk.payload);
                diagnostics.records += records.len();

                for record in &records {
                    if chunk.chunk_type == ChunkType::Checkpoint {
                        checkpoints.push(CheckpointInfo::from(record));
                    }
                    extractor.push(decoder.decode(record), &mut diagnostics);
                }

                if let Some(e) = error {
                    diagnostics.failed_records += 1;
                    diagnostics.warn(format!(
                        "{:?} chunk at offset {}: framing stopped after {} records: {}",
                        chunk.chunk_type,
                        chunk.offset,
                        records.len(),
                        e
                    ));
                }
            }
            ChunkType::Unknown(id) => {
                diagnostics.unknown_chunks += 1;
                debug!(
                    "Skipping unknown chunk type {} at offset {} ({} bytes)",
                    id,
                    chunk.offset,
                    chunk.size()
                );
            }
        }
    }

    let extracted = extractor.finish();

    info!(
        "Parsed replay: {} chunks, {} records, {} eliminations, {} teams",
        diagnostics.chunks,
        diagnostics.records,
        extracted.eliminations.len(),
        extracted.team_stats.len()
    );

    Ok(ParsedReplay {
        header,
        game_header,
        eliminations: extracted.eliminations,
        stats: extracted.stats,
        team_stats: extracted.team_stats,
        checkpoints,
        data_chunks,
        diagnostics,
    })
}

fn record_walk_end(error: Error, diagnostics: &mut Diagnostics) {
    match error {
        Error::LimitExceeded(_) => diagnostics.limit_reached = true,
        _ => diagnostics.truncated = true,
    }
    diagnostics.warn(format!("chunk walk ended early: {}", error));
}

/// Decode the first header chunk; later ones are ignored
fn find_game_header(chunks: &[Chunk<'_>], diagnostics: &mut Diagnostics) -> Option<GameHeader> {
    let chunk = chunks
        .iter()
        .find(|chunk| chunk.chunk_type == ChunkType::Header)?;

    match GameHeader::parse(chunk.payload) {
        Ok(game) => {
            debug!(
                "Game header: branch {}, engine network version {}",
                game.branch, game.engine_network_version
            );
            Some(game)
        }
        Err(e) => {
            diagnostics.skipped_chunks += 1;
            diagnostics.warn(format!(
                "header chunk at offset {} unreadable: {}",
                chunk.offset, e
            ));
            None
        }
    }
}

fn parse_data_chunk(
    chunk: &Chunk<'_>,
    header: &ReplayHeader,
    options: &ParseOptions,
) -> Result<DataChunkInfo> {
    if let Some(max) = options.max_bytes.filter(|_| header.is_compressed()) {
        let declared = declared_decompressed_size(chunk, header).unwrap_or(0);
        if declared > max {
            return Err(Error::LimitExceeded(format!(
                "declared decompressed size {} exceeds limit {}",
                declared, max
            )));
        }
    }
    DataChunkInfo::parse(chunk, header)
}

/// Peek at the decompressed size an envelope declares, if readable
fn declared_decompressed_size(chunk: &Chunk<'_>, header: &ReplayHeader) -> Option<usize> {
    let skip = if header.has_chunk_times() { 16 } else { 0 };
    let field = chunk.payload.get(skip + 4..skip + 8)?;
    let bytes: [u8; 4] = field.try_into().ok()?;
    Some(u32::from_le_bytes(bytes) as usize)
}
