//! # fnreplay
//!
//! A Rust library for decoding Fortnite `.replay` files.
//!
//! ## Overview
//!
//! Fortnite replays are Unreal Engine local-file demo captures: a versioned
//! file header followed by typed, length-prefixed chunks. Event chunks carry
//! bit-packed records keyed by name. This library provides:
//!
//! - Reading the file header and the Fortnite header chunk
//! - Walking the chunk container, tolerating truncated captures and
//!   unknown chunk types
//! - Decompressing replay-data bodies (DEFLATE, zlib, ZSTD)
//! - AES-256-ECB decryption of encrypted event payloads
//! - Decoding eliminations, match stats and team placements
//! - Diagnostic counters for everything that could not be decoded
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::fs::File;
//!
//! fn main() -> anyhow::Result<()> {
//!     let replay = fnreplay::open(File::open("UnsavedReplay.replay")?)?;
//!
//!     for elim in replay.eliminations() {
//!         println!("{}", elim);
//!     }
//!
//!     if let Some(stats) = replay.stats() {
//!         println!("Accuracy: {}%", stats.accuracy_percent());
//!     }
//!
//!     let diagnostics = replay.diagnostics();
//!     println!("{} unknown records", diagnostics.unknown_records);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Resource limits
//!
//! ```rust,no_run
//! use fnreplay::ParseOptions;
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = std::fs::read("UnsavedReplay.replay")?;
//!     let options = ParseOptions::new()
//!         .with_max_chunks(10_000)
//!         .with_max_bytes(256 * 1024 * 1024);
//!     let replay = fnreplay::parse_with_options(&data, &options)?;
//!
//!     if replay.diagnostics().limit_reached {
//!         eprintln!("replay was only partially read");
//!     }
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod compression;
pub mod crypto;
pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod extract;
pub mod header;
pub mod replay;
pub mod utils;

#[cfg(test)]
mod testutil;

pub use chunk::{CheckpointInfo, Chunk, ChunkReader, ChunkType, DataChunkInfo};
pub use compression::CompressionMethod;
pub use cursor::{BitCursor, ByteCursor};
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use events::{Elimination, Event, EventKind, MatchStats, PlayerId, TeamStats, Weapon};
pub use header::{GameHeader, Release, ReplayFlags, ReplayHeader};
pub use replay::{open, open_with_options, parse, parse_with_options, ParseOptions, ParsedReplay};
pub use utils::{format_size, format_time};
