//! Reporting for ssu-rector runs
//!
//! Text output shows each file's new docblock lines and the TODOs written,
//! JSON collects everything into one document printed at the end, and diff
//! prints a unified patch per annotated file.

use colored::*;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" | "patch" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// One TODO line written (or to be written) by a rule
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationInfo {
    pub rule: String,
    /// Position of the annotated statement or declaration (1-based)
    pub line: usize,
    pub column: usize,
    pub todo: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Clean,
    Annotated,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn new(path: &Path, annotations: Vec<AnnotationInfo>) -> Self {
        let status = if annotations.is_empty() {
            FileStatus::Clean
        } else {
            FileStatus::Annotated
        };
        Self {
            path: path.display().to_string(),
            status,
            annotations,
            error: None,
        }
    }

    fn failed(path: &Path, error: &str) -> Self {
        Self {
            path: path.display().to_string(),
            status: FileStatus::Failed,
            annotations: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_processed: usize,
    pub files_annotated: usize,
    pub annotations: usize,
    pub errors: usize,
    /// Annotation count per rule name
    pub by_rule: BTreeMap<String, usize>,
}

impl Summary {
    fn add(&mut self, report: &FileReport) {
        self.files_processed += 1;
        match report.status {
            FileStatus::Clean => {}
            FileStatus::Annotated => {
                self.files_annotated += 1;
                self.annotations += report.annotations.len();
                for annotation in &report.annotations {
                    *self.by_rule.entry(annotation.rule.clone()).or_default() += 1;
                }
            }
            FileStatus::Failed => self.errors += 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'r> {
    version: &'static str,
    mode: &'static str,
    summary: &'r Summary,
    files: &'r [FileReport],
}

/// Collects per-file results and prints them in the selected format
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    files: Vec<FileReport>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            files: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// A file that needs no annotations
    pub fn report_clean(&mut self, path: &Path) {
        if self.verbose && self.format == OutputFormat::Text {
            println!("{} {}", "clean".dimmed(), path.display());
        }
        self.push(FileReport::new(path, Vec::new()));
    }

    /// Annotations found in check mode; nothing was written
    pub fn report_check(
        &mut self,
        path: &Path,
        annotations: Vec<AnnotationInfo>,
        old_source: &str,
        new_source: &str,
    ) {
        match self.format {
            OutputFormat::Text => {
                println!("{}", path.display().to_string().bold());
                print_added_lines(old_source, new_source);
                print_annotations(&annotations);
            }
            OutputFormat::Diff => print_unified_diff(path, old_source, new_source),
            OutputFormat::Json => {}
        }
        self.push(FileReport::new(path, annotations));
    }

    /// Annotations written to disk in fix mode
    pub fn report_written(&mut self, path: &Path, annotations: Vec<AnnotationInfo>) {
        if self.format == OutputFormat::Text {
            println!(
                "{} {} ({} TODO{})",
                "annotated".green(),
                path.display(),
                annotations.len(),
                if annotations.len() == 1 { "" } else { "s" }
            );
            if self.verbose {
                print_annotations(&annotations);
            }
        }
        self.push(FileReport::new(path, annotations));
    }

    pub fn report_error(&mut self, path: &Path, error: &str) {
        if self.format == OutputFormat::Text {
            eprintln!("{}: {} - {}", "Warning".yellow(), path.display(), error);
        }
        self.push(FileReport::failed(path, error));
    }

    fn push(&mut self, report: FileReport) {
        self.summary.add(&report);
        self.files.push(report);
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Print the closing summary (text) or the whole report (JSON)
    pub fn finish(self, check_mode: bool) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => print_text_summary(&self.summary, check_mode),
            OutputFormat::Json => {
                let report = JsonReport {
                    version: env!("CARGO_PKG_VERSION"),
                    mode: if check_mode { "check" } else { "fix" },
                    summary: &self.summary,
                    files: &self.files,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Diff => {}
        }
        Ok(())
    }
}

fn print_text_summary(summary: &Summary, check_mode: bool) {
    println!();
    println!("{}", "Summary".bold().underline());
    println!("  Files processed: {}", summary.files_processed);
    println!("  Files annotated: {}", summary.files_annotated);
    println!("  TODO annotations: {}", summary.annotations);
    for (rule, count) in &summary.by_rule {
        println!("    {:<34} {}", rule.cyan(), count);
    }
    if summary.errors > 0 {
        println!("  Errors: {}", summary.errors.to_string().red());
    }

    if check_mode && summary.annotations > 0 {
        println!();
        println!("{}", "Run with --fix to write the annotations".yellow());
    }
}

fn print_annotations(annotations: &[AnnotationInfo]) {
    for annotation in annotations {
        println!(
            "  {}:{} [{}] {}",
            annotation.line,
            annotation.column,
            annotation.rule.cyan(),
            annotation.todo
        );
    }
    println!();
}

/// Annotating only adds or rewrites docblocks, so the inserted lines are what matters
fn print_added_lines(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let text = change.to_string_lossy();
        let text = text.trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Insert => println!("  {}", format!("+ {}", text).green()),
            ChangeTag::Delete => println!("  {}", format!("- {}", text).red()),
            ChangeTag::Equal => {}
        }
    }
}

fn print_unified_diff(path: &Path, old: &str, new: &str) {
    let name = path.display().to_string();
    let diff = TextDiff::from_lines(old, new);
    print!(
        "{}",
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("a/{}", name), &format!("b/{}", name))
    );
}
