//! Authoritative buffer content and its line index.

use crate::line_index::{IndexMode, LineIndex};
use crate::rope::Rope;

/// Owns the mirrored content.
///
/// Every splice replaces the content with a new [`Rope`] value; ropes handed
/// out earlier keep their old content.
#[derive(Debug, Clone, Default)]
pub struct TextStore {
    content: Rope,
    index: LineIndex,
    mode: IndexMode,
    revision: u64,
}

impl TextStore {
    /// Create an empty store.
    pub fn new(mode: IndexMode) -> Self {
        Self {
            content: Rope::new(),
            index: LineIndex::new(),
            mode,
            revision: 0,
        }
    }

    /// Current content.
    pub fn content(&self) -> &Rope {
        &self.content
    }

    /// Line index for the content as of the last [`TextStore::commit`].
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Number of splices applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Insert `bytes` at `offset`.
    pub fn splice_insert(&mut self, offset: usize, bytes: &[u8]) {
        let next = self.content.splice_insert(offset, bytes);
        if self.mode == IndexMode::Incremental {
            self.index.apply_insert(offset, bytes);
        }
        self.content = next;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Remove `len` bytes at `offset`; returns how many bytes were removed.
    pub fn splice_delete(&mut self, offset: usize, len: usize) -> usize {
        let before = self.content.len();
        if self.mode == IndexMode::Incremental {
            let removed = self.content.copy_range(offset..offset.saturating_add(len));
            self.index.apply_delete(offset, &removed);
        }
        self.content = self.content.splice_delete(offset, len);
        self.revision = self.revision.wrapping_add(1);
        before - self.content.len()
    }

    /// Contiguous copy of the current content.
    pub fn materialize(&self) -> Vec<u8> {
        self.content.materialize()
    }

    /// Finish an edit: snapshot the content and bring the index up to date.
    ///
    /// In [`IndexMode::Rebuild`] the index is recomputed from the snapshot;
    /// in [`IndexMode::Incremental`] it was already patched by the splice.
    pub fn commit(&mut self) -> Vec<u8> {
        let snapshot = self.materialize();
        if self.mode == IndexMode::Rebuild {
            self.index.rebuild(&snapshot);
        }
        snapshot
    }
}
