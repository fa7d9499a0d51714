/*!
# Source spans

`PackedSpan` is the compact location type shared by the tree model, the
matcher and diagnostics reporting.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact span representation (offset + length) within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PackedSpan {
    pub start: u32,
    pub len: u32,
}

impl PackedSpan {
    pub fn new(start: u32, len: u32) -> Self { Self { start, len } }
    pub fn empty() -> Self { Self { start: 0, len: 0 } }
    pub fn end(&self) -> u32 { self.start.saturating_add(self.len) }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Span по границам [start, end). При end < start получаем пустой span в точке start.
    pub fn from_bounds(start: u32, end: u32) -> Self {
        Self { start, len: end.saturating_sub(start) }
    }

    /// Позиция лежит внутри span (конец не включается).
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// Span целиком лежит внутри текущего.
    pub fn contains_span(&self, other: PackedSpan) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Префикс span длиной не больше `len` (для ключевых слов).
    pub fn prefix(&self, len: u32) -> Self {
        Self { start: self.start, len: len.min(self.len) }
    }

    /// Суффикс span длиной не больше `len` (закрывающая скобка блока).
    pub fn suffix(&self, len: u32) -> Self {
        let len = len.min(self.len);
        Self { start: self.end() - len, len }
    }
}

impl fmt::Display for PackedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end())
    }
}
