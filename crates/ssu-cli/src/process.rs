//! File processing logic for ssu-rector
//!
//! Processing runs in two passes: every input and scan file is parsed once to
//! build the shared class index, then each input file is parsed again and
//! checked against the enabled rules.

use anyhow::{Context, Result};
use bumpalo::Bump;
use mago_database::file::FileId;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use ssu_core::apply_edits;
use ssu_rules::{collect_classes, ClassIndex, ClassInfo, RuleRegistry};

use crate::config::Config;
use crate::output::AnnotationInfo;

/// Result of processing a single file
pub struct ProcessResult {
    /// Annotations found in the file
    pub annotations: Vec<AnnotationInfo>,
    /// Original source code
    pub old_source: String,
    /// New source code after edits (only if edits were found)
    pub new_source: Option<String>,
}

/// Expand files and directories into the `.php` files to process
///
/// Returns the files found and the paths that do not exist.
pub fn collect_php_files(paths: &[PathBuf], config: &Config) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut file_paths = Vec::new();
    let mut missing_paths = Vec::new();

    for path in paths {
        if path.is_file() {
            file_paths.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "php"))
            {
                let file_path = entry.path();
                if !config.should_exclude(file_path) {
                    file_paths.push(file_path.to_path_buf());
                }
            }
        } else {
            missing_paths.push(path.clone());
        }
    }

    file_paths.sort();
    file_paths.dedup();
    (file_paths, missing_paths)
}

/// Collect the classes declared in one file
fn index_file(path: &Path) -> Result<Vec<ClassInfo>> {
    let source_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let arena = Bump::new();
    let file_id = FileId::new(path.to_string_lossy().as_ref());
    let (program, parse_error) =
        mago_syntax::parser::parse_file_content(&arena, file_id, &source_code);

    if parse_error.is_some() {
        debug!(path = %path.display(), "parse error, indexing recovered classes only");
    }

    Ok(collect_classes(program, &source_code))
}

/// First pass: build the class index from every given file
pub fn build_index(paths: &[PathBuf]) -> ClassIndex {
    let indexed: Vec<Vec<ClassInfo>> = paths
        .par_iter()
        .filter_map(|path| match index_file(path) {
            Ok(classes) => Some(classes),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "skipping file while indexing");
                None
            }
        })
        .collect();

    let mut index = ClassIndex::new();
    for classes in indexed {
        index.extend(classes);
    }
    debug!(files = paths.len(), classes = index.len(), "built class index");
    index
}

/// Second pass: check a single PHP file and return the annotations found
///
/// `Ok(None)` signals a parse error.
pub fn process_file(
    path: &Path,
    registry: &RuleRegistry,
    enabled_rules: &HashSet<String>,
    index: &ClassIndex,
) -> Result<Option<ProcessResult>> {
    let source_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let arena = Bump::new();
    let file_id = FileId::new(path.to_string_lossy().as_ref());
    let (program, parse_error) =
        mago_syntax::parser::parse_file_content(&arena, file_id, &source_code);

    if parse_error.is_some() {
        return Ok(None);
    }

    let result = registry.check_all(program, &source_code, enabled_rules, index);

    if result.is_empty() {
        return Ok(Some(ProcessResult {
            annotations: vec![],
            old_source: source_code,
            new_source: None,
        }));
    }

    let annotations: Vec<AnnotationInfo> = result
        .annotations
        .iter()
        .map(|annotation| {
            let (line, column) = offset_to_line_column(&source_code, annotation.offset as usize);
            AnnotationInfo {
                rule: annotation.rule.clone(),
                line,
                column,
                todo: annotation.text.clone(),
            }
        })
        .collect();

    let new_source = apply_edits(&source_code, &result.edits)
        .with_context(|| format!("Failed to apply edits to {}", path.display()))?;

    Ok(Some(ProcessResult {
        annotations,
        old_source: source_code,
        new_source: Some(new_source),
    }))
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Convert byte offset to line and column numbers (1-based)
fn offset_to_line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FRAMEWORK: &str = r#"<?php
namespace SilverStripe\Dev;

abstract class BuildTask
{
    public function run($request) {}
}
"#;

    const APP: &str = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

class MigrateTask extends BuildTask
{
    public function run($request)
    {
    }
}
"#;

    fn enabled(rules: &[&str]) -> HashSet<String> {
        rules.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_offset_to_line_column() {
        let source = "line1\nline2\nline3";
        assert_eq!(offset_to_line_column(source, 0), (1, 1));
        assert_eq!(offset_to_line_column(source, 5), (1, 6));
        assert_eq!(offset_to_line_column(source, 6), (2, 1));
        assert_eq!(offset_to_line_column(source, 12), (3, 1));
    }

    #[test]
    fn test_collect_php_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/vendor")).unwrap();
        fs::write(temp.path().join("src/Page.php"), "<?php").unwrap();
        fs::write(temp.path().join("src/notes.txt"), "").unwrap();
        fs::write(temp.path().join("src/vendor/Lib.php"), "<?php").unwrap();

        let config = Config {
            paths: crate::config::PathsConfig {
                exclude: vec!["vendor/".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let missing = temp.path().join("missing");
        let (files, missing_paths) =
            collect_php_files(&[temp.path().join("src"), missing.clone()], &config);

        assert_eq!(files, vec![temp.path().join("src/Page.php")]);
        assert_eq!(missing_paths, vec![missing]);
    }

    #[test]
    fn test_subclass_in_another_file_is_annotated() {
        let temp = TempDir::new().unwrap();
        let framework = temp.path().join("BuildTask.php");
        let app = temp.path().join("MigrateTask.php");
        fs::write(&framework, FRAMEWORK).unwrap();
        fs::write(&app, APP).unwrap();

        let index = build_index(&[framework, app.clone()]);
        assert!(index.get("SilverStripe\\Dev\\BuildTask").is_some());

        let registry = RuleRegistry::new();
        let result = process_file(&app, &registry, &enabled(&["add_new_parameter"]), &index)
            .unwrap()
            .unwrap();

        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].rule, "add_new_parameter");
        assert_eq!((result.annotations[0].line, result.annotations[0].column), (8, 5));
        assert!(result
            .new_source
            .unwrap()
            .contains("    /** @TODO UPGRADE TASK - BuildTask::run: Added new parameter $output in BuildTask::run() */\n    public function run($request)"));
    }

    #[test]
    fn test_unindexed_parent_matches_by_short_name() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("MigrateTask.php");
        fs::write(&app, APP).unwrap();

        // The parent chain stops at the unindexed framework class, whose name still matches
        let index = build_index(&[app.clone()]);
        let registry = RuleRegistry::new();
        let result = process_file(&app, &registry, &enabled(&["add_new_parameter"]), &index)
            .unwrap()
            .unwrap();
        assert_eq!(result.annotations.len(), 1);
    }

    #[test]
    fn test_default_rules_annotate_removed_method_once() {
        let temp = TempDir::new().unwrap();
        let controller = temp.path().join("Controller.php");
        fs::write(
            &controller,
            r#"<?php
namespace App;

use DNADesign\Elemental\Controllers\ElementalAreaController;

class Controller extends ElementalAreaController
{
    public function formAction()
    {
        return 1;
    }
}
"#,
        )
        .unwrap();

        let registry = RuleRegistry::new();
        let defaults: HashSet<String> = registry.default_names().iter().map(|r| r.to_string()).collect();
        let index = build_index(&[controller.clone()]);
        let result = process_file(&controller, &registry, &defaults, &index)
            .unwrap()
            .unwrap();

        let line = "ElementalAreaController::formAction: removed without equivalent functionality to replace it";
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].rule, "obsolete_method");
        assert_eq!(result.new_source.unwrap().matches(line).count(), 1);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("broken.php");
        fs::write(&broken, "<?php\nclass {").unwrap();

        let registry = RuleRegistry::new();
        let result = process_file(&broken, &registry, &enabled(&["add_new_parameter"]), &ClassIndex::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let registry = RuleRegistry::new();
        let result = process_file(
            Path::new("/nonexistent/file.php"),
            &registry,
            &enabled(&["add_new_parameter"]),
            &ClassIndex::new(),
        );
        assert!(result.is_err());
    }
}
