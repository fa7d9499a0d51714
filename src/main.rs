/*!
# ENC Analyzer CLI

Command-line interface for diffing syntax trees and classifying edits that
cannot be applied to a running program.

Trees are read from the JSON interchange format; active statements from an
optional JSON list of `{ offset, part?, leaf?, partially_executed? }`.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use enc_analyzer::analyzer::{load_documents, AnalysisEngine, AnalyzerConfig, EditSummary};
use enc_analyzer::ast_core::json::{load_active_statements, load_tree};
use enc_analyzer::cli_common::{self, format_duration, validate_path, OutputFormat, OutputWriter};
use enc_analyzer::core::cancel::CancellationToken;
use enc_analyzer::matching::{compute_top_level_match, EditScript};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "enc-analyzer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Syntax tree diffing and rude edit detection for live code updates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Path to analyzer configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one pair of trees
    Analyze {
        /// Old tree (JSON)
        #[arg(long)]
        old: PathBuf,

        /// New tree (JSON)
        #[arg(long)]
        new: PathBuf,

        /// Active statements of the old tree (JSON)
        #[arg(long)]
        active: Option<PathBuf>,
    },

    /// Print the top-level match and edit script
    Diff {
        #[arg(long)]
        old: PathBuf,

        #[arg(long)]
        new: PathBuf,
    },

    /// Analyze every `*.json` tree in a directory against its counterpart
    Batch {
        #[arg(long)]
        old_dir: PathBuf,

        #[arg(long)]
        new_dir: PathBuf,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = cli_common::init_logging(cli.verbose) {
        cli_common::print_error(&e.to_string());
    }
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            cli_common::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::load_from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    let mut writer = match &cli.output {
        Some(path) => OutputWriter::file(path, cli.format)
            .with_context(|| format!("Failed to create output file {}", path.display()))?,
        None => OutputWriter::stdout(cli.format),
    };

    let rude = match cli.command {
        Commands::Analyze { old, new, active } => analyze_command(config, &old, &new, active.as_deref(), &mut writer)?,
        Commands::Diff { old, new } => {
            diff_command(&config, &old, &new, &mut writer)?;
            false
        }
        Commands::Batch { old_dir, new_dir, workers } => {
            let config = AnalyzerConfig { workers: workers.unwrap_or(config.workers), ..config };
            batch_command(config, &old_dir, &new_dir, &mut writer)?
        }
    };
    writer.flush()?;
    Ok(if rude { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

fn load_pair(old: &Path, new: &Path) -> Result<(enc_analyzer::SyntaxTree, enc_analyzer::SyntaxTree)> {
    validate_path(old, "Old tree")?;
    validate_path(new, "New tree")?;
    let old_tree = load_tree(old).with_context(|| format!("Failed to load tree from {}", old.display()))?;
    let new_tree = load_tree(new).with_context(|| format!("Failed to load tree from {}", new.display()))?;
    Ok((old_tree, new_tree))
}

fn analyze_command(
    config: AnalyzerConfig,
    old: &Path,
    new: &Path,
    active: Option<&Path>,
    writer: &mut OutputWriter,
) -> Result<bool> {
    let (old_tree, new_tree) = load_pair(old, new)?;
    let active = match active {
        Some(path) => load_active_statements(path)
            .with_context(|| format!("Failed to load active statements from {}", path.display()))?,
        None => Vec::new(),
    };

    let engine = AnalysisEngine::new(config)?;
    let analysis = engine.analyze_document(&old_tree, &new_tree, &active, &CancellationToken::new())?;
    writer.write_report(&new.display().to_string(), &analysis.report(&old_tree, &new_tree))?;
    Ok(analysis.has_rude_edits())
}

fn diff_command(config: &AnalyzerConfig, old: &Path, new: &Path, writer: &mut OutputWriter) -> Result<()> {
    let (old_tree, new_tree) = load_pair(old, new)?;
    let options = config.match_options();
    let top_match = compute_top_level_match(&old_tree, &new_tree, &options, &CancellationToken::new())?;
    let script = EditScript::compute(&old_tree, &new_tree, &top_match, &options);
    if writer.format() == OutputFormat::Text {
        writer.write_header(&format!("{} matched pairs, {} edits", top_match.len(), script.len()))?;
    }
    let edits: Vec<EditSummary> = script.edits().iter().map(|e| EditSummary::describe(&old_tree, &new_tree, e)).collect();
    writer.write_edits(&edits)
}

fn batch_command(config: AnalyzerConfig, old_dir: &Path, new_dir: &Path, writer: &mut OutputWriter) -> Result<bool> {
    validate_path(old_dir, "Old directory")?;
    validate_path(new_dir, "New directory")?;
    let start = Instant::now();

    let documents = load_documents(old_dir, new_dir)?;

    let engine = AnalysisEngine::new(config)?;
    let reports = engine.analyze_documents(&documents, &CancellationToken::new())?;
    writer.write_batch(&reports)?;
    tracing::info!("Batch analysis finished in {}", format_duration(start.elapsed()));
    Ok(reports.iter().any(|r| !r.report.diagnostics.is_empty()))
}
