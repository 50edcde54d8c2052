//! Comments attached to statements and declarations
//!
//! Comments come from the program trivia. A comment belongs to a node when
//! only whitespace separates it from the node (or from the next comment that
//! belongs to it). Annotations are collected on a [`PendingDoc`] per target
//! and turned into a single [`Edit`] once the file has been traversed.

use mago_span::Span;
use mago_syntax::ast::{Trivia, TriviaKind};
use ssu_core::{CommentTarget, Edit};

/// Comments directly preceding a node
#[derive(Debug, Clone, Default)]
pub struct AttachedComments {
    /// Every attached comment, in source order
    pub comments: Vec<String>,
    /// The docblock nearest to the node
    pub doc: Option<(Span, String)>,
}

/// Collect the comments directly preceding `node_start`
pub fn attached_comments(trivia: &[Trivia<'_>], source: &str, node_start: u32) -> AttachedComments {
    let mut attached = AttachedComments::default();
    let candidate_idx = trivia.partition_point(|t| t.span.start.offset < node_start);

    let bytes = source.as_bytes();
    let mut covered_from = node_start;

    for t in trivia[..candidate_idx].iter().rev() {
        let gap = bytes
            .get(t.span.end.offset as usize..covered_from as usize)
            .unwrap_or(&[]);
        if !gap.iter().all(u8::is_ascii_whitespace) {
            break;
        }

        match t.kind {
            TriviaKind::WhiteSpace => {}
            TriviaKind::DocBlockComment => {
                if attached.doc.is_none() {
                    attached.doc = Some((t.span, t.value.to_string()));
                }
                attached.comments.push(t.value.trim_end().to_string());
            }
            TriviaKind::SingleLineComment
            | TriviaKind::MultiLineComment
            | TriviaKind::HashComment => {
                attached.comments.push(t.value.trim_end().to_string());
            }
        }
        covered_from = t.span.start.offset;
    }

    attached.comments.reverse();
    attached
}

/// Leading whitespace of the line containing `offset`
pub fn line_indent(source: &str, offset: u32) -> String {
    let offset = (offset as usize).min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Documentation of one annotation target, accumulated during a traversal
#[derive(Debug, Clone)]
pub struct PendingDoc {
    /// Span of the annotated node
    node: Span,
    original: Option<(Span, String)>,
    comments: Vec<String>,
    current: Option<String>,
    indent: String,
    added: Vec<String>,
}

impl PendingDoc {
    pub fn new(trivia: &[Trivia<'_>], source: &str, node: Span) -> Self {
        let attached = attached_comments(trivia, source, node.start.offset);
        let current = attached.doc.as_ref().map(|(_, text)| text.clone());
        Self {
            node,
            original: attached.doc,
            comments: attached.comments,
            current,
            indent: line_indent(source, node.start.offset),
            added: Vec::new(),
        }
    }

    /// Remember lines a rule wrote to this target
    pub fn record(&mut self, lines: &[String]) {
        self.added.extend(lines.iter().cloned());
    }

    /// The edit that writes the accumulated docblock, if anything was added
    pub fn into_edit(self) -> Option<Edit> {
        let text = self.current?;
        if self.added.is_empty() {
            return None;
        }
        let message = self.added.join("\n");

        Some(match self.original {
            Some((span, _)) => Edit::new(span, text, message),
            None => Edit::insert(
                self.node,
                self.node.start.offset,
                format!("{}\n{}", text, self.indent),
                message,
            ),
        })
    }
}

impl CommentTarget for PendingDoc {
    fn comments(&self) -> Vec<String> {
        let mut all = self.comments.clone();
        all.extend(self.current.clone());
        all
    }

    fn doc_comment(&self) -> Option<String> {
        self.current.clone()
    }

    fn set_doc_comment(&mut self, text: String) {
        self.current = Some(text);
    }

    fn indent(&self) -> &str {
        &self.indent
    }
}
