//! `(line, column)` to byte offset translation.
//!
//! Targets arrive in the coordinates of the content before the edit, so
//! translation always runs against the index of the previously applied edit.

use crate::codec::Target;
use crate::error::MirrorError;
use crate::line_index::LineIndex;
use std::fmt;
use std::str::FromStr;

/// What to do with targets that fall outside the current content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinatePolicy {
    /// Reject with [`MirrorError::CoordinateOutOfRange`].
    #[default]
    Strict,
    /// Pull the target back inside the content.
    Clamp,
}

impl CoordinatePolicy {
    /// Returns the configuration spelling of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            CoordinatePolicy::Strict => "strict",
            CoordinatePolicy::Clamp => "clamp",
        }
    }

    /// Resolve `target` plus a removal length into a byte span.
    ///
    /// Inserts pass `len == 0`.
    ///
    /// # Errors
    /// Under [`CoordinatePolicy::Strict`], returns
    /// [`MirrorError::CoordinateOutOfRange`] when the line does not exist, the
    /// column is past the line's content, or the span runs past the end.
    pub fn resolve(
        self,
        index: &LineIndex,
        target: Target,
        len: usize,
    ) -> Result<Span, MirrorError> {
        match self {
            CoordinatePolicy::Strict => resolve_strict(index, target, len),
            CoordinatePolicy::Clamp => Ok(resolve_clamped(index, target, len)),
        }
    }
}

impl fmt::Display for CoordinatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CoordinatePolicy::Strict),
            "clamp" => Ok(CoordinatePolicy::Clamp),
            other => Err(format!(
                "unknown coordinate policy '{}' (expected 'strict' or 'clamp')",
                other
            )),
        }
    }
}

/// Resolved byte range of one edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

/// Unchecked translation of `(line, column)` into a byte offset.
pub fn to_offset(index: &LineIndex, line: usize, column: usize) -> usize {
    index.to_offset(line, column)
}

fn out_of_range(index: &LineIndex, target: Target, len: usize) -> MirrorError {
    MirrorError::CoordinateOutOfRange {
        line: target.line,
        column: target.column,
        len,
        line_count: index.line_count(),
        content_len: index.total_len(),
    }
}

fn resolve_strict(index: &LineIndex, target: Target, len: usize) -> Result<Span, MirrorError> {
    let content_len = index
        .content_len(target.line)
        .ok_or_else(|| out_of_range(index, target, len))?;
    if target.column > content_len {
        return Err(out_of_range(index, target, len));
    }
    let offset = to_offset(index, target.line, target.column);
    match offset.checked_add(len) {
        Some(end) if end <= index.total_len() => Ok(Span { offset, len }),
        _ => Err(out_of_range(index, target, len)),
    }
}

fn resolve_clamped(index: &LineIndex, target: Target, len: usize) -> Span {
    let line = target.line.min(index.line_count() - 1);
    let column = target.column.min(index.content_len(line).unwrap_or(0));
    let offset = to_offset(index, line, column);
    let len = len.min(index.total_len().saturating_sub(offset));
    Span { offset, len }
}
