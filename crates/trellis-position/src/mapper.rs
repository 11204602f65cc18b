//! Converts positions between a raw template source and its compiled text

use crate::diff::{DiffEngine, DiffScript, Granularity, WordDiff};
use crate::lines::{LineIndex, Position};
use dashmap::DashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Direction {
    ToRaw,
    ToCompiled,
}

/// Bidirectional position mapping for one (raw, compiled) text pair.
///
/// The raw text is the "old" side of the diff and the compiled text the
/// "new" side. The edit script is computed on first use and shared by every
/// conversion afterwards; converted positions are memoized as well.
///
/// Positions inside template-injected text (no raw counterpart) or inside
/// template code (no compiled counterpart) snap to the nearest boundary of
/// the enclosing unchanged text. Out-of-range positions are clamped.
pub struct PositionMapper<E: DiffEngine = WordDiff> {
    raw: String,
    compiled: String,
    raw_lines: LineIndex,
    compiled_lines: LineIndex,
    engine: E,
    script: OnceLock<DiffScript>,
    memo: DashMap<(Direction, Position), Position>,
}

impl PositionMapper<WordDiff> {
    pub fn new(raw: impl Into<String>, compiled: impl Into<String>) -> Self {
        Self::with_engine(raw, compiled, WordDiff)
    }
}

impl<E: DiffEngine> PositionMapper<E> {
    pub fn with_engine(raw: impl Into<String>, compiled: impl Into<String>, engine: E) -> Self {
        let raw = raw.into();
        let compiled = compiled.into();
        PositionMapper {
            raw_lines: LineIndex::new(&raw),
            compiled_lines: LineIndex::new(&compiled),
            raw,
            compiled,
            engine,
            script: OnceLock::new(),
            memo: DashMap::new(),
        }
    }

    pub fn raw_lines(&self) -> &LineIndex {
        &self.raw_lines
    }

    pub fn compiled_lines(&self) -> &LineIndex {
        &self.compiled_lines
    }

    /// The memoized edit script from raw to compiled.
    pub fn script(&self) -> &DiffScript {
        self.script
            .get_or_init(|| self.engine.diff(&self.raw, &self.compiled))
    }

    /// Position in the compiled text -> position in the raw text.
    pub fn to_raw(&self, compiled: Position) -> Position {
        self.memoized(Direction::ToRaw, compiled)
    }

    /// Position in the raw text -> position in the compiled text.
    pub fn to_compiled(&self, raw: Position) -> Position {
        self.memoized(Direction::ToCompiled, raw)
    }

    fn memoized(&self, direction: Direction, position: Position) -> Position {
        if let Some(hit) = self.memo.get(&(direction, position)) {
            return *hit;
        }
        let mapped = match direction {
            Direction::ToRaw => self.convert(position, &self.compiled_lines, &self.raw_lines, DiffScript::old_number),
            Direction::ToCompiled => self.convert(position, &self.raw_lines, &self.compiled_lines, DiffScript::new_number),
        };
        self.memo.insert((direction, position), mapped);
        mapped
    }

    /// Resolve the line first, then the character within that line, with the
    /// same script walk at both granularities.
    fn convert(
        &self,
        position: Position,
        from: &LineIndex,
        to: &LineIndex,
        walk: fn(&DiffScript, usize, Granularity) -> usize,
    ) -> Position {
        let script = self.script();
        let position = from.clamp(position);

        let line = walk(script, position.line as usize, Granularity::Line).min(to.line_count() - 1);
        let offset = walk(script, from.offset_at(position), Granularity::Character);

        let character = offset
            .saturating_sub(to.line_start(line))
            .min(to.line_len(line));

        Position::new(line as u32, character as u32)
    }
}

impl<E: DiffEngine> std::fmt::Debug for PositionMapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionMapper")
            .field("raw_len", &self.raw_lines.len())
            .field("compiled_len", &self.compiled_lines.len())
            .field("diffed", &self.script.get().is_some())
            .finish()
    }
}
