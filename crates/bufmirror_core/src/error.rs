//! Error types for the mirror engine.
use thiserror::Error;

/// Top-level engine error type.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Channel closed after {received} of {expected} bytes")]
    ChannelClosed { expected: usize, received: usize },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error(
        "Coordinate out of range: line {line}, column {column} (len {len}) against {line_count} line(s), {content_len} byte(s)"
    )]
    CoordinateOutOfRange {
        line: usize,
        column: usize,
        len: usize,
        line_count: usize,
        content_len: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Returns `true` when the engine cannot continue after this error.
    ///
    /// Only out-of-range coordinates are recoverable: the offending edit is
    /// skipped and the stream stays in sync.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MirrorError::CoordinateOutOfRange { .. })
    }

    /// Returns `true` when the channel closed cleanly between two records.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, MirrorError::ChannelClosed { received: 0, .. })
    }
}
