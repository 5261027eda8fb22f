//! Best-effort parse telemetry

use serde::Serialize;
use tracing::warn;

/// Counters describing what a parse could not fully decode
///
/// A non-zero counter never means the parse failed; it tells the caller
/// how much of the replay the typed results are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Chunks walked, of any type
    pub chunks: usize,
    /// Chunks dropped because they could not be decoded
    pub skipped_chunks: usize,
    /// Chunks with a type tag this reader does not know
    pub unknown_chunks: usize,
    /// Event and checkpoint records framed
    pub records: usize,
    /// Records with no known schema
    pub unknown_records: usize,
    /// Records that matched a schema but failed to decode, plus framing failures
    pub failed_records: usize,
    /// The chunk walk ended early on damaged or missing input
    pub truncated: bool,
    /// The chunk walk stopped at a caller-supplied limit
    pub limit_reached: bool,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    /// Record a warning and log it
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// True when every chunk and record was fully understood
    pub fn is_clean(&self) -> bool {
        self.skipped_chunks == 0
            && self.unknown_chunks == 0
            && self.unknown_records == 0
            && self.failed_records == 0
            && !self.truncated
            && !self.limit_reached
    }
}
