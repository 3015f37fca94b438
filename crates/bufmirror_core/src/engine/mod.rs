//! Engine loop tying reader, decoder, store and sink together.
//!
//! One engine owns one channel for its whole life. Records are applied in
//! arrival order, each translated against the line index left by the previous
//! edit, and every applied edit is followed by a full render.

use crate::channel::{ChannelReader, ChannelSource};
use crate::codec::{EditOp, EditRecord, RecordDecoder};
use crate::config::Config;
use crate::coords::CoordinatePolicy;
use crate::error::MirrorError;
use crate::line_index::LineIndex;
use crate::render::RenderSink;
use crate::rope::Rope;
use crate::store::TextStore;
use serde::Serialize;
use tracing::{debug, error, info, warn};


/// Result of applying one record.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// The edit changed the content and a frame was rendered.
    Applied { revision: u64 },
    /// The target was out of range; content and index are untouched.
    Skipped(MirrorError),
}

/// Counters describing an engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub records: u64,
    pub inserts: u64,
    pub deletes: u64,
    pub skipped: u64,
    pub bytes_inserted: u64,
    pub bytes_deleted: u64,
    pub revision: u64,
    pub content_len: usize,
    pub line_count: usize,
}

/// Mirrors one remote buffer.
pub struct MirrorEngine<S, K> {
    reader: ChannelReader<S>,
    decoder: RecordDecoder,
    store: TextStore,
    policy: CoordinatePolicy,
    sink: K,
    stats: EngineStats,
}

impl<S: ChannelSource, K: RenderSink> MirrorEngine<S, K> {
    /// Create an engine reading from `source` and rendering into `sink`.
    pub fn new(source: S, sink: K, config: &Config) -> Self {
        let store = TextStore::new(config.index_mode);
        let stats = EngineStats {
            line_count: store.line_index().line_count(),
            ..EngineStats::default()
        };
        Self {
            reader: ChannelReader::new(source, config.backoff()),
            decoder: RecordDecoder::new(config.max_payload_len),
            store,
            policy: config.coordinates,
            sink,
            stats,
        }
    }

    /// Current mirrored content.
    pub fn content(&self) -> &Rope {
        self.store.content()
    }

    /// Line index the next record will be translated against.
    pub fn line_index(&self) -> &LineIndex {
        self.store.line_index()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Block for the next record and apply it.
    ///
    /// # Errors
    /// Propagates channel, decode and render failures; all of them are fatal.
    pub fn step(&mut self) -> Result<ApplyOutcome, MirrorError> {
        let record = self.decoder.decode(&mut self.reader)?;
        self.apply(&record)
    }

    /// Apply one decoded record.
    ///
    /// Out-of-range targets are skipped under [`CoordinatePolicy::Strict`].
    ///
    /// # Errors
    /// Returns [`MirrorError::Io`] when the render sink fails.
    pub fn apply(&mut self, record: &EditRecord) -> Result<ApplyOutcome, MirrorError> {
        self.stats.records += 1;
        let op = record.op();
        let requested = match op {
            EditOp::Insert => 0,
            EditOp::Delete => record.payload_len(),
        };
        let span = match self
            .policy
            .resolve(self.store.line_index(), record.target, requested)
        {
            Ok(span) => span,
            Err(err) if !err.is_fatal() => {
                warn!(
                    op = op.as_str(),
                    line = record.target.line,
                    column = record.target.column,
                    "Skipping edit: {}",
                    err
                );
                self.stats.skipped += 1;
                return Ok(ApplyOutcome::Skipped(err));
            }
            Err(err) => return Err(err),
        };

        match op {
            EditOp::Insert => {
                self.store.splice_insert(span.offset, &record.payload);
                self.stats.inserts += 1;
                self.stats.bytes_inserted += record.payload_len() as u64;
            }
            EditOp::Delete => {
                let removed = self.store.splice_delete(span.offset, span.len);
                self.stats.deletes += 1;
                self.stats.bytes_deleted += removed as u64;
            }
        }

        let snapshot = self.store.commit();
        self.sink.render(&snapshot)?;

        let revision = self.store.revision();
        self.stats.revision = revision;
        self.stats.content_len = snapshot.len();
        self.stats.line_count = self.store.line_index().line_count();
        debug!(
            op = op.as_str(),
            line = record.target.line,
            column = record.target.column,
            offset = span.offset,
            len = record.payload_len(),
            revision,
            content_len = snapshot.len(),
            "applied edit"
        );
        Ok(ApplyOutcome::Applied { revision })
    }

    /// Apply records until the channel closes.
    ///
    /// # Returns
    /// The final [`EngineStats`] when the writer closed the channel between
    /// two records.
    ///
    /// # Errors
    /// Any other failure, including a channel that closes mid-record.
    pub fn run(&mut self) -> Result<EngineStats, MirrorError> {
        info!(
            coordinates = self.policy.as_str(),
            index = self.store.mode().as_str(),
            "Mirror engine started"
        );
        loop {
            match self.step() {
                Ok(_) => {}
                Err(err) if err.is_clean_close() => {
                    info!(
                        records = self.stats.records,
                        revision = self.stats.revision,
                        "Channel closed, stopping"
                    );
                    return Ok(self.stats.clone());
                }
                Err(err) => {
                    error!("Mirror engine stopped: {}", err);
                    return Err(err);
                }
            }
        }
    }
}
