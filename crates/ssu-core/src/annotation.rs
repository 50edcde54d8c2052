//! TODO annotation lines and the idempotent docblock writer

use crate::catalog::ChangeRecord;
use crate::hierarchy::short_class_name;

/// Prefix convention of the emitted TODO line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TodoStyle {
    #[default]
    UpgradeTask,
    SsuRector,
}

impl TodoStyle {
    pub fn prefix(&self) -> &'static str {
        match self {
            TodoStyle::UpgradeTask => "@TODO UPGRADE TASK",
            TodoStyle::SsuRector => "@TODO SSU RECTOR UPGRADE TASK",
        }
    }
}

/// Render the annotation line for a record
///
/// `@TODO UPGRADE TASK - BuildTask::run: <note>`; type-level records omit
/// the `::method` part.
pub fn todo_line(style: TodoStyle, record: &ChangeRecord) -> String {
    let class = short_class_name(&record.target_class);
    if record.is_type_level() {
        format!("{} - {}: {}", style.prefix(), class, record.note)
    } else {
        format!("{} - {}::{}: {}", style.prefix(), class, record.method_name, record.note)
    }
}

/// Documentation attached to a statement or declaration
pub trait CommentTarget {
    /// Text of every comment attached to the target, docblock included
    fn comments(&self) -> Vec<String>;

    /// The docblock, if the target has one
    fn doc_comment(&self) -> Option<String>;

    fn set_doc_comment(&mut self, text: String);

    /// Indentation of the target's first line
    fn indent(&self) -> &str {
        ""
    }
}

/// Add `line` to the target's documentation unless it is already there
///
/// Returns whether the target changed.
pub fn write_annotation<T: CommentTarget + ?Sized>(target: &mut T, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    if target.comments().iter().any(|comment| comment.contains(line)) {
        return false;
    }

    let text = match target.doc_comment() {
        Some(existing) => merge_into_docblock(&existing, line, target.indent()),
        None => format!("/** {} */", line),
    };
    target.set_doc_comment(text);
    true
}

/// Append `line` to an existing docblock
///
/// A block closed by `*/` is reopened before the terminator and continued
/// with its own line prefix. Anything else gets a second block appended.
pub fn merge_into_docblock(existing: &str, line: &str, indent: &str) -> String {
    let trimmed = existing.trim_end();

    let Some(body) = trimmed.strip_suffix("*/") else {
        return format!("{}\n{}/** {} */", existing, indent, line);
    };

    let star_indent = star_indent(trimmed).unwrap_or_else(|| format!("{} ", indent));

    format!(
        "{}\n{}* {}\n{}*/",
        body.trim_end(),
        star_indent,
        line,
        star_indent
    )
}

/// Whitespace in front of the `*` column of a multi-line block
fn star_indent(block: &str) -> Option<String> {
    let mut lines = block.lines().skip(1).peekable();
    lines.peek()?;

    let leading = |l: &str| -> String { l.chars().take_while(|c| c.is_whitespace()).collect() };

    let mut fallback = None;
    for l in lines {
        if l.trim_start().starts_with('*') {
            if l.trim() == "*/" {
                return Some(leading(l));
            }
            fallback = Some(leading(l));
        }
    }
    fallback
}
