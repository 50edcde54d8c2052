//! Span-based source edits for docblock annotations
//!
//! Annotating never touches code: an edit either replaces an existing
//! docblock or inserts a new one in front of a statement or declaration.

use mago_span::{Position, Span};
use thiserror::Error;

/// Errors that can occur during edit application
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Overlapping edits detected at offset {0}")]
    OverlappingEdits(usize),

    #[error("Edit span {start}..{end} out of bounds for source length {len}")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },
}

/// A single replacement of a source range
#[derive(Debug, Clone)]
pub struct Edit {
    /// The source span to replace (zero-width for insertions)
    pub span: Span,
    /// The replacement text
    pub replacement: String,
    /// Annotation lines this edit adds, one per line
    pub message: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
            message: message.into(),
        }
    }

    /// Insert `text` in front of the byte offset `at` of `anchor`'s file
    pub fn insert(anchor: Span, at: u32, text: impl Into<String>, message: impl Into<String>) -> Self {
        let position = Position::new(at);
        Self::new(Span::new(anchor.file_id, position, position), text, message)
    }

    pub fn start_offset(&self) -> usize {
        self.span.start.offset as usize
    }

    pub fn end_offset(&self) -> usize {
        self.span.end.offset as usize
    }

    pub fn is_insertion(&self) -> bool {
        self.start_offset() == self.end_offset()
    }
}

/// Apply edits to source code
///
/// Edits are applied from the end of the file towards the start so earlier
/// offsets stay valid. Insertions at the same offset keep their given order.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    let mut sorted: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    sorted.sort_by(|(ia, a), (ib, b)| {
        b.start_offset()
            .cmp(&a.start_offset())
            .then_with(|| ib.cmp(ia))
    });

    let source_len = source.len();
    let mut prev_start: Option<usize> = None;

    for (_, edit) in &sorted {
        let start = edit.start_offset();
        let end = edit.end_offset();

        if end > source_len || start > end {
            return Err(EditError::SpanOutOfBounds {
                start,
                end,
                len: source_len,
            });
        }

        if let Some(prev) = prev_start {
            if end > prev {
                return Err(EditError::OverlappingEdits(start));
            }
        }

        prev_start = Some(start);
    }

    let mut result = source.to_string();
    for (_, edit) in sorted {
        result.replace_range(edit.start_offset()..edit.end_offset(), &edit.replacement);
    }

    Ok(result)
}
