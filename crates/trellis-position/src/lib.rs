//! Position mapping between raw template sources and their
//! compiled text through a word-level diff

pub mod diff;
pub mod lines;
pub mod mapper;


pub use diff::{DiffEngine, DiffScript, DiffSpan, Granularity, SpanKind, WordDiff};
pub use lines::{LineIndex, Position, Range};
pub use mapper::PositionMapper;
