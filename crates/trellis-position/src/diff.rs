//! Word-level edit scripts between two texts

use similar::{Algorithm, ChangeTag, TextDiff};

/// What a span of the edit script does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Present in both texts.
    Kept,
    /// Present only in the new text.
    Inserted,
    /// Present only in the old text.
    Deleted,
}

/// Unit a walk over the script counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Line,
    Character,
}

/// A run of consecutive words sharing one [`SpanKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSpan {
    pub kind: SpanKind,
    pub text: String,
    newlines: usize,
    chars: usize,
}

impl DiffSpan {
    pub fn new(kind: SpanKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let newlines = text.matches('\n').count();
        let chars = text.chars().count();
        DiffSpan { kind, text, newlines, chars }
    }

    pub fn count(&self, unit: Granularity) -> usize {
        match unit {
            Granularity::Line => self.newlines,
            Granularity::Character => self.chars,
        }
    }

    fn append(&mut self, text: &str) {
        self.newlines += text.matches('\n').count();
        self.chars += text.chars().count();
        self.text.push_str(text);
    }
}

/// Ordered kept/inserted/deleted spans turning an old text into a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffScript {
    spans: Vec<DiffSpan>,
}

impl DiffScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, merging it into the last span when the kind matches.
    pub fn push(&mut self, kind: SpanKind, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.kind == kind => last.append(text),
            _ => self.spans.push(DiffSpan::new(kind, text)),
        }
    }

    pub fn spans(&self) -> &[DiffSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Reassemble the old text.
    pub fn old_text(&self) -> String {
        self.spans
            .iter()
            .filter(|s| s.kind != SpanKind::Inserted)
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Reassemble the new text.
    pub fn new_text(&self) -> String {
        self.spans
            .iter()
            .filter(|s| s.kind != SpanKind::Deleted)
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Convert a line or character number of the new text into the old text.
    ///
    /// A number inside an inserted span snaps to where the insertion starts in
    /// the old text. Deleted spans directly after the resolved point are
    /// skipped when kept text follows them.
    pub fn old_number(&self, new_number: usize, unit: Granularity) -> usize {
        if self.spans.is_empty() {
            return new_number;
        }

        let mut old_number = 0;
        let mut current = 0;

        for (i, span) in self.spans.iter().enumerate() {
            let count = span.count(unit);

            match span.kind {
                SpanKind::Deleted => old_number += count,
                SpanKind::Inserted => {
                    if new_number < current + count {
                        current = new_number;
                    } else {
                        current += count;
                    }
                }
                SpanKind::Kept => {
                    if new_number < current + count {
                        old_number += new_number - current;
                        current = new_number;
                    } else {
                        old_number += count;
                        current += count;
                    }
                }
            }

            if current >= new_number {
                let mut removed_after = 0;
                for next in &self.spans[i + 1..] {
                    if next.kind == SpanKind::Deleted {
                        removed_after += next.count(unit);
                    } else {
                        old_number += removed_after;
                        break;
                    }
                }
                break;
            }
        }

        old_number
    }

    /// Convert a line or character number of the old text into the new text.
    ///
    /// A number inside a deleted span snaps to where the deletion sits in the
    /// new text.
    pub fn new_number(&self, old_number: usize, unit: Granularity) -> usize {
        if self.spans.is_empty() {
            return old_number;
        }

        let mut new_number = 0;
        let mut current = 0;

        for span in &self.spans {
            let count = span.count(unit);

            match span.kind {
                SpanKind::Deleted => current += count,
                SpanKind::Inserted => new_number += count,
                SpanKind::Kept => {
                    if current + count > old_number {
                        return new_number + old_number.saturating_sub(current);
                    }
                    current += count;
                    new_number += count;
                }
            }
        }

        new_number
    }
}

/// Computes edit scripts.
pub trait DiffEngine: Send + Sync {
    fn diff(&self, old: &str, new: &str) -> DiffScript;
}

/// Myers diff over words and whitespace runs, so an edit inside a long line
/// stays local instead of replacing the whole line.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordDiff;

impl DiffEngine for WordDiff {
    fn diff(&self, old: &str, new: &str) -> DiffScript {
        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_words(old, new);

        let mut script = DiffScript::new();
        for change in diff.iter_all_changes() {
            let kind = match change.tag() {
                ChangeTag::Equal => SpanKind::Kept,
                ChangeTag::Insert => SpanKind::Inserted,
                ChangeTag::Delete => SpanKind::Deleted,
            };
            script.push(kind, change.value());
        }

        tracing::trace!("word diff produced {} spans", script.spans().len());
        script
    }
}

impl<E: DiffEngine + ?Sized> DiffEngine for &E {
    fn diff(&self, old: &str, new: &str) -> DiffScript {
        (**self).diff(old, new)
    }
}
