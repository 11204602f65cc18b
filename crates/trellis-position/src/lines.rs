//! Line/character coordinates over a text

use serde::{Deserialize, Serialize};

/// Zero-based line and character (Unicode scalar value) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }
}

/// Start offsets of every line of a text, in characters.
///
/// All lookups clamp: lines past the end resolve to the last line and
/// characters past the end of a line resolve to its end.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        let mut len = 0;
        for ch in text.chars() {
            len += 1;
            if ch == '\n' {
                starts.push(len);
            }
        }
        LineIndex { starts, len }
    }

    /// Number of lines; an empty text has one empty line.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Total length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clamp_line(&self, line: usize) -> usize {
        line.min(self.starts.len() - 1)
    }

    /// Offset of the first character of a line.
    pub fn line_start(&self, line: usize) -> usize {
        self.starts[self.clamp_line(line)]
    }

    /// Length of a line, excluding its terminating newline.
    pub fn line_len(&self, line: usize) -> usize {
        let line = self.clamp_line(line);
        match self.starts.get(line + 1) {
            Some(next) => next - 1 - self.starts[line],
            None => self.len - self.starts[line],
        }
    }

    /// Bring a position inside the text.
    pub fn clamp(&self, position: Position) -> Position {
        let line = self.clamp_line(position.line as usize);
        let character = (position.character as usize).min(self.line_len(line));
        Position::new(line as u32, character as u32)
    }

    /// Character offset of a position.
    pub fn offset_at(&self, position: Position) -> usize {
        let position = self.clamp(position);
        self.starts[position.line as usize] + position.character as usize
    }

    /// Position of a character offset.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        Position::new(line as u32, (offset - self.starts[line]) as u32)
    }
}
