//! Core library for bufmirror: reconstructs a remote editor buffer from its
//! binary modification channel.

/// Channel sources, polling reader and channel path naming.
pub mod channel;
/// Edit record wire codec.
pub mod codec;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants used across bufmirror crates.
pub mod constants;
/// `(line, column)` to byte offset translation.
pub mod coords;
/// Engine loop tying reader, store and sink together.
pub mod engine;
/// Engine error types.
pub mod error;
/// Line length index over buffer content.
pub mod line_index;
/// Display sinks for buffer snapshots.
pub mod render;
/// Persistent byte rope.
pub mod rope;
/// Authoritative buffer content and its line index.
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use channel::{Backoff, ChannelReader, ChannelSource, FileChannel, MemoryChannel};
pub use codec::{EditOp, EditRecord, RecordDecoder, Target};
pub use config::Config;
pub use constants::*;
pub use coords::CoordinatePolicy;
pub use engine::{ApplyOutcome, EngineStats, MirrorEngine};
pub use error::MirrorError;
pub use line_index::{IndexMode, LineIndex};
pub use render::{MemorySink, RenderSink, TerminalSink};
pub use rope::Rope;
pub use store::TextStore;
