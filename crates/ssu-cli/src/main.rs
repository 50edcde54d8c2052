//! ssu-rector CLI - annotate Silverstripe code with upgrade TODOs
//!
//! Each rule pairs an embedded Silverstripe 6 change catalog with a TODO
//! style. Run `ssu-rector --list-rules` for the full list.

mod config;
mod output;
mod process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use output::{AnnotationInfo, OutputFormat, Reporter};
use process::{build_index, collect_php_files, process_file, write_file};
use ssu_rules::{load_catalog_dir, load_catalog_file, ClassIndex, RuleRegistry};

#[derive(Parser)]
#[command(name = "ssu-rector")]
#[command(version)]
#[command(about = "Annotate Silverstripe code with upgrade TODOs")]
struct Cli {
    /// Files or directories to annotate
    #[arg(required_unless_present = "list_rules")]
    paths: Vec<PathBuf>,

    /// Report annotations without writing them (default mode)
    #[arg(long, conflicts_with = "fix")]
    check: bool,

    /// Write annotations to files
    #[arg(long, conflicts_with = "check")]
    fix: bool,

    /// Show changes without applying them (alias for --check)
    #[arg(long, short = 'n', hide = true, conflicts_with = "fix")]
    dry_run: bool,

    /// Show verbose output and debug logs
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Rules to run (can be specified multiple times). Overrides config file.
    #[arg(long, short = 'r', value_name = "RULE")]
    rule: Vec<String>,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Path to config file (default: auto-detect .ssu-rector.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// Directories whose classes are indexed but not annotated (can be repeated)
    #[arg(long, value_name = "DIR")]
    scan: Vec<PathBuf>,

    /// Directory of YAML catalogs replacing the embedded ones by name
    #[arg(long, value_name = "DIR")]
    catalog_dir: Option<PathBuf>,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

/// Check mode unless `--fix` is given; clap rejects `--fix` with either check flag
fn is_check_mode(cli: &Cli) -> bool {
    cli.check || cli.dry_run || !cli.fix
}

/// Logs go to stderr so JSON and diff output stay clean on stdout
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut registry = RuleRegistry::new();

    // Handle --list-rules
    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        for (name, description) in registry.list_rules() {
            let opt_in = if registry.is_opt_in(name) { " (opt-in)" } else { "" };
            println!("  {} - {}{}", name.green(), description, opt_in.dimmed());
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Load config file
    let config = if cli.no_config {
        Config::default()
    } else if let Some(config_path) = &cli.config {
        let cfg = Config::load_path(config_path)?;
        debug!(path = %config_path.display(), "using config");
        cfg
    } else {
        match Config::load()? {
            Some((cfg, path)) => {
                debug!(path = %path.display(), "using config");
                cfg
            }
            None => Config::default(),
        }
    };

    // Determine output format: CLI flag, then config, then text
    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        let format = cli
            .format
            .as_deref()
            .or(config.output.format.as_deref())
            .unwrap_or("text");
        OutputFormat::from_str(format).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json, diff",
                format
            )
        })?
    };

    // Replace embedded catalogs: --catalog-dir first, then per-rule config entries
    if let Some(dir) = &cli.catalog_dir {
        let catalogs = load_catalog_dir(dir)
            .with_context(|| format!("Failed to load catalogs from {}", dir.display()))?;
        for catalog in catalogs {
            let name = catalog.name.clone();
            if !registry.set_catalog(&name, catalog) {
                warn!(catalog = %name, "catalog matches no rule");
            }
        }
    }

    for (rule, path) in &config.rules.catalogs {
        let catalog = load_catalog_file(path)
            .with_context(|| format!("Failed to load catalog for rule '{}'", rule))?;
        let records = catalog.records.len();
        if registry.set_catalog(rule, catalog) {
            debug!(rule = %rule, path = %path.display(), records, "replaced catalog");
        } else {
            warn!(rule = %rule, "catalog configured for unknown rule");
        }
    }

    let all_rules = registry.all_names();

    // Validate rule names from CLI
    for rule in &cli.rule {
        if !all_rules.contains(&rule.as_str()) {
            eprintln!(
                "{}: Unknown rule '{}'. Use --list-rules to see available rules.",
                "Error".red(),
                rule
            );
            return Ok(ExitCode::from(1));
        }
    }

    let enabled_rules = config.effective_rules(&registry.default_names(), &cli.rule);
    if enabled_rules.is_empty() {
        eprintln!("{}: No rules enabled", "Error".red());
        return Ok(ExitCode::from(1));
    }

    let check_mode = is_check_mode(&cli);
    let fix_mode = !check_mode;

    if cli.verbose && output_format == OutputFormat::Text {
        let mut names: Vec<&str> = enabled_rules.iter().map(String::as_str).collect();
        names.sort_unstable();
        println!("{}: {}", "Mode".bold(), if fix_mode { "fix" } else { "check" });
        println!("{}: {}", "Rules".bold(), names.join(", "));
        println!();
    }

    let (file_paths, missing_paths) = collect_php_files(&cli.paths, &config);

    // Scan directories feed the index only; exclude patterns do not apply to them
    let scan_dirs: Vec<PathBuf> = config
        .paths
        .scan
        .iter()
        .chain(cli.scan.iter())
        .cloned()
        .collect();
    let (scan_paths, missing_scan) = collect_php_files(&scan_dirs, &Config::default());
    for path in &missing_scan {
        warn!(path = %path.display(), "scan directory does not exist");
    }

    let mut index_paths = file_paths.clone();
    index_paths.extend(scan_paths);
    index_paths.sort();
    index_paths.dedup();
    let index = build_index(&index_paths);

    // Process files in parallel
    let results: Vec<FileOutcome> = file_paths
        .par_iter()
        .map(|path| process_file_to_outcome(path, &registry, &enabled_rules, &index))
        .collect();

    let mut reporter = Reporter::new(output_format, cli.verbose);

    for path in &missing_paths {
        if output_format == OutputFormat::Text {
            eprintln!("{}: Path does not exist: {}", "Warning".yellow(), path.display());
        }
    }

    // file_paths is sorted, so reporting order is deterministic
    for (path, result) in file_paths.iter().zip(results) {
        report_outcome(path, result, fix_mode, &mut reporter)?;
    }

    let summary = reporter.summary();
    info!(
        files = summary.files_processed,
        annotated = summary.files_annotated,
        annotations = summary.annotations,
        errors = summary.errors,
        indexed_classes = index.len(),
        "run complete"
    );

    let exit_code = if summary.errors > 0 {
        ExitCode::from(1)
    } else if check_mode && summary.files_annotated > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    reporter.finish(check_mode)?;

    Ok(exit_code)
}

/// Result of processing a single file (for parallel processing)
enum FileOutcome {
    /// File needs no annotations
    NoChanges,
    /// File has annotations to report/write
    HasChanges {
        annotations: Vec<AnnotationInfo>,
        old_source: String,
        new_source: String,
    },
    /// Parse error occurred
    ParseError,
    /// Other error occurred
    Error(String),
}

/// Process a file and return an outcome (no writes, suitable for parallel execution)
fn process_file_to_outcome(
    path: &Path,
    registry: &RuleRegistry,
    enabled_rules: &HashSet<String>,
    index: &ClassIndex,
) -> FileOutcome {
    match process_file(path, registry, enabled_rules, index) {
        Ok(Some(result)) => match result.new_source {
            Some(new_source) if !result.annotations.is_empty() => FileOutcome::HasChanges {
                annotations: result.annotations,
                old_source: result.old_source,
                new_source,
            },
            _ => FileOutcome::NoChanges,
        },
        Ok(None) => FileOutcome::ParseError,
        Err(e) => FileOutcome::Error(format!("{:#}", e)),
    }
}

/// Report a file outcome and write annotations in fix mode
fn report_outcome(
    path: &Path,
    outcome: FileOutcome,
    fix_mode: bool,
    reporter: &mut Reporter,
) -> Result<()> {
    match outcome {
        FileOutcome::NoChanges => {
            reporter.report_clean(path);
        }
        FileOutcome::HasChanges {
            annotations,
            old_source,
            new_source,
        } => {
            if fix_mode {
                write_file(path, &new_source)?;
                reporter.report_written(path, annotations);
            } else {
                reporter.report_check(path, annotations, &old_source, &new_source);
            }
        }
        FileOutcome::ParseError => {
            reporter.report_error(path, "Parse error, skipping");
        }
        FileOutcome::Error(msg) => {
            reporter.report_error(path, &msg);
        }
    }
    Ok(())
}
