//! Line length index over buffer content.
//!
//! Each entry is the byte length of one line including its `\n` terminator;
//! the final entry is the trailing segment after the last newline (possibly
//! empty). Empty content is indexed as `[0]`.

use std::fmt;
use std::str::FromStr;

/// How the line index follows content changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMode {
    /// Patch only the lines a splice touched.
    #[default]
    Incremental,
    /// Recompute the whole index from a snapshot after every edit.
    Rebuild,
}

impl IndexMode {
    /// Returns the configuration spelling of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            IndexMode::Incremental => "incremental",
            IndexMode::Rebuild => "rebuild",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(IndexMode::Incremental),
            "rebuild" => Ok(IndexMode::Rebuild),
            other => Err(format!(
                "unknown index mode '{}' (expected 'incremental' or 'rebuild')",
                other
            )),
        }
    }
}

/// Line lengths of the current buffer content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    lens: Vec<usize>,
    total: usize,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LineIndex {
    /// Index of empty content.
    pub fn new() -> Self {
        Self {
            lens: vec![0],
            total: 0,
        }
    }

    /// Index a contiguous buffer.
    pub fn from_bytes(content: &[u8]) -> Self {
        Self::from_chunks(std::iter::once(content))
    }

    /// Index content delivered as consecutive fragments.
    pub fn from_chunks<'a, I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut lens = Vec::new();
        let mut current = 0;
        let mut total = 0;
        for chunk in chunks {
            total += chunk.len();
            let mut rest = chunk;
            while let Some(pos) = rest.iter().position(|&byte| byte == b'\n') {
                lens.push(current + pos + 1);
                current = 0;
                rest = &rest[pos + 1..];
            }
            current += rest.len();
        }
        lens.push(current);
        Self { lens, total }
    }

    /// Number of entries, always at least one.
    pub fn line_count(&self) -> usize {
        self.lens.len()
    }

    /// Sum of all entries; equals the indexed content length.
    pub fn total_len(&self) -> usize {
        self.total
    }

    /// Raw line lengths.
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    /// Length of `line` including its terminator.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        self.lens.get(line).copied()
    }

    /// Length of `line` without its terminator.
    pub fn content_len(&self, line: usize) -> Option<usize> {
        let len = self.line_len(line)?;
        if line + 1 == self.lens.len() {
            Some(len)
        } else {
            Some(len.saturating_sub(1))
        }
    }

    /// Byte offset where `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line >= self.lens.len() {
            return None;
        }
        Some(self.lens[..line].iter().sum())
    }

    /// Unchecked translation: `sum(lens[0..line]) + column`.
    ///
    /// Lines past the end of the index contribute nothing, so the result may
    /// point past the content.
    pub fn to_offset(&self, line: usize, column: usize) -> usize {
        self.lens.iter().take(line).sum::<usize>() + column
    }

    /// Returns the line containing `offset` and that line's start offset.
    ///
    /// Offsets at or past the end resolve to the last line.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let last = self.lens.len() - 1;
        let mut start = 0;
        for (line, len) in self.lens.iter().enumerate() {
            if line == last || offset < start + len {
                return (line, start);
            }
            start += len;
        }
        (last, start)
    }

    /// Replace the whole index with one computed from `content`.
    pub fn rebuild(&mut self, content: &[u8]) {
        *self = Self::from_bytes(content);
    }

    /// Account for `inserted` being spliced in at `offset`.
    pub fn apply_insert(&mut self, offset: usize, inserted: &[u8]) {
        if inserted.is_empty() {
            return;
        }
        let offset = offset.min(self.total);
        let (line, start) = self.locate(offset);
        let before = offset - start;
        let after = self.lens[line] - before;

        let mut replacement = Vec::new();
        let mut current = before;
        for &byte in inserted {
            current += 1;
            if byte == b'\n' {
                replacement.push(current);
                current = 0;
            }
        }
        replacement.push(current + after);

        self.lens.splice(line..=line, replacement);
        self.total += inserted.len();
    }

    /// Account for `removed` having been cut out at `offset`.
    ///
    /// `removed` must be the exact bytes taken from the content.
    pub fn apply_delete(&mut self, offset: usize, removed: &[u8]) {
        if removed.is_empty() {
            return;
        }
        let (line, _) = self.locate(offset);
        let newlines = removed.iter().filter(|&&byte| byte == b'\n').count();
        let last = (line + newlines).min(self.lens.len() - 1);
        let merged = self.lens[line..=last]
            .iter()
            .sum::<usize>()
            .saturating_sub(removed.len());
        self.lens.splice(line..=last, std::iter::once(merged));
        self.total = self.total.saturating_sub(removed.len());
    }
}
