use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use maint_core::config::ExportConfig;
use maint_core::{ReportError, classify_error, logging};
use maint_export::{Document, ExportedFile, TableExporter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Xlsx,
    Pdf,
    Both,
}

/// Export the visible rows of a dashboard table snapshot.
#[derive(Debug, Parser)]
#[command(name = "maint-export", version)]
struct Cli {
    /// Saved page or table markup.
    #[arg(short, long)]
    input: PathBuf,

    /// `id` of the table to export.
    #[arg(short, long)]
    table: String,

    /// Filename prefix and PDF title. Defaults to the configured prefix.
    #[arg(short, long)]
    prefix: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Both)]
    format: Format,

    /// Output directory. Overrides the configured one.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Config file. Defaults to `~/.maint/config.json`.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<ExportConfig> {
    let loaded = match &cli.config {
        Some(path) => ExportConfig::load_from_path(path),
        None => ExportConfig::load(),
    };
    let mut config = loaded.map_err(|e| ReportError::Config(format!("{e:#}")))?;
    if let Some(out) = &cli.out {
        config.output_dir = Some(out.clone());
    }
    Ok(config)
}

fn report(kind: &str, result: Option<ExportedFile>) {
    match result {
        Some(file) => {
            info!("{kind} export: {} rows", file.row_count);
            println!("{}", file.path.display());
        }
        None => warn!("{kind} export skipped: nothing to export"),
    }
}

fn run(cli: &Cli, config: &ExportConfig) -> Result<()> {
    let markup = std::fs::read_to_string(&cli.input)
        .map_err(|e| ReportError::Markup(format!("{}: {e}", cli.input.display())))?;
    let document = Document::parse(&markup)?;
    let exporter = TableExporter::from_config(&document, &cli.table, config)?;
    let prefix = cli.prefix.as_deref().unwrap_or(&config.default_prefix);

    if matches!(cli.format, Format::Xlsx | Format::Both) {
        report("Spreadsheet", exporter.export_spreadsheet(prefix)?);
    }
    if matches!(cli.format, Format::Pdf | Format::Both) {
        report("Document", exporter.export_document(prefix)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", classify_error(&e).user_message);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e:#}");
            None
        }
    };
    info!("Starting maint-export v{VERSION}");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let classified = classify_error(&e);
            error!(category = ?classified.category, "Export failed: {}", classified.message);
            eprintln!("{}", classified.user_message);
            ExitCode::FAILURE
        }
    }
}
