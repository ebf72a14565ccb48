use miette::SourceSpan;
use serde::Serialize;

pub type Span = SourceSpan;

/// Byte range of a node or token in the query source, `end` exclusive.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, Serialize)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Location { start, end }
    }

    /// Zero-width location, used for errors reported at the end of input.
    pub fn point(offset: usize) -> Self {
        Location { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Location covering both `self` and `other`.
    pub fn join(self, other: Location) -> Location {
        Location {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// True when `self` ends exactly where `other` starts.
    pub fn precedes(self, other: Location) -> bool {
        self.end == other.start
    }
}

impl From<std::ops::Range<usize>> for Location {
    fn from(range: std::ops::Range<usize>) -> Self {
        Location::new(range.start, range.end)
    }
}

impl From<Location> for Span {
    fn from(location: Location) -> Self {
        Span::from((location.start, location.len()))
    }
}

/// The metadata wrapper type
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct M<T> {
    pub location: Location,
    pub value: T,
}

impl<T> M<T> {
    pub fn new(value: T, location: Location) -> Self {
        M { location, value }
    }

    pub fn new_range(value: T, left: Location, right: Location) -> Self {
        M {
            location: left.join(right),
            value,
        }
    }
}

/// Maps byte offsets to 1-based line and column numbers.
///
/// Columns count characters, not bytes, so that multi-byte text before a
/// token does not shift the caret in editor diagnostics.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(offset, _)| offset + 1),
        );
        LineIndex { line_starts }
    }

    /// Returns `(line, column)` for `offset`. Offsets past the end of the
    /// source land on the last line.
    pub fn line_col(&self, source: &str, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let end = offset.min(source.len());
        let column = source
            .get(line_start..end)
            .map(|text| text.chars().count())
            .unwrap_or(end - line_start);
        (line + 1, column + 1)
    }
}
