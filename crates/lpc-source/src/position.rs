use miette::SourceSpan;

/// A caret position inside a source file.
///
/// `line` is 1-based, `column` is a 0-based character offset into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range on a single line.
    pub fn at(line: u32, column: u32) -> Self {
        let pos = Position::new(line, column);
        Self { start: pos, end: pos }
    }

    /// Whether `pos` lies inside the range. The end is inclusive so a caret
    /// placed right after the last character still counts.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_multiline(&self) -> bool {
        self.end.line > self.start.line
    }

    /// Smallest range covering both.
    pub fn cover(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Maps byte offsets to line/column positions and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position::new(line as u32 + 1, column as u32)
    }

    /// Byte offset of `pos`, clamped to the end of its line.
    pub fn offset(&self, text: &str, pos: Position) -> Option<usize> {
        let line = (pos.line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        let line_text = text.get(start..end)?;
        let within = line_text
            .char_indices()
            .nth(pos.column as usize)
            .map(|(idx, _)| idx)
            .unwrap_or(line_text.len());
        Some(start + within)
    }

    pub fn range(&self, text: &str, span: SourceSpan) -> Range {
        Range::new(
            self.position(text, span.offset()),
            self.position(text, span.offset() + span.len()),
        )
    }

    pub fn span(&self, text: &str, range: &Range) -> SourceSpan {
        let start = self.offset(text, range.start).unwrap_or(text.len());
        let end = self.offset(text, range.end).unwrap_or(text.len()).max(start);
        SourceSpan::from((start, end - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based_lines_zero_based_columns() {
        let text = "int x;\nvoid f() {}\n";
        let index = LineIndex::new(text);
        assert_eq!(index.position(text, 0), Position::new(1, 0));
        assert_eq!(index.position(text, 4), Position::new(1, 4));
        assert_eq!(index.position(text, 7), Position::new(2, 0));
        assert_eq!(index.position(text, 12), Position::new(2, 5));
    }

    #[test]
    fn test_offset_round_trips_through_position() {
        let text = "a\nbcd\nef";
        let index = LineIndex::new(text);
        for offset in 0..text.len() {
            let pos = index.position(text, offset);
            assert_eq!(index.offset(text, pos), Some(offset));
        }
        assert_eq!(index.offset(text, Position::new(9, 0)), None);
    }

    #[test]
    fn test_range_contains_is_end_inclusive() {
        let range = Range::new(Position::new(2, 4), Position::new(2, 8));
        assert!(range.contains(Position::new(2, 8)));
        assert!(!range.contains(Position::new(2, 9)));
        assert!(!range.contains(Position::new(1, 5)));
    }
}
