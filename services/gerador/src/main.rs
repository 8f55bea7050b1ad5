//! Gerador - offline survey CSV → `edificio` ZIP generator
//!
//! Responsibilities:
//! - Load the survey CSV (encoding fallback, `;` delimiter)
//! - Map and serialize every row
//! - Write `moradias_xml_{station}_{timestamp}.zip` to the output directory
//! - Print the detected columns and the processing log
//!
//! Same input + same clock = same archive contents.

use anyhow::{Context, Result};
use clap::Parser;
use edificio_core::logging::{init_logging, LogConfig, LogFormat};
use edificio_core::pipeline::{build_documents, process_table, BatchOptions};
use edificio_core::{load_csv, CsvTable, SystemClock};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gerador", version, about = "Generates edificio XML archives from survey CSV files")]
struct Args {
    /// Survey CSV file (`;`-delimited)
    #[arg(default_value = "cto.csv")]
    input: PathBuf,

    /// Directory that receives the ZIP archive
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Parent of the temporary staging directory (defaults to the system temp dir)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Dry run - map and serialize only, no archive written
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

impl Args {
    fn batch_options(&self) -> BatchOptions {
        let options = BatchOptions::new(&self.output_dir);
        match &self.staging_dir {
            Some(dir) => options.with_staging_dir(dir),
            None => options,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

fn describe_table(table: &CsvTable) -> Vec<String> {
    let mut lines = vec![
        format!("Encoding: {}", table.encoding),
        format!("Rows: {}", table.len()),
        format!("Detected columns ({}):", table.headers.len()),
    ];
    lines.extend(
        table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("  [{i:2}] {h}")),
    );
    lines
}

fn print_log(log: &str) {
    if !log.is_empty() {
        println!("\nProcessing log:");
        println!("{log}");
    }
}

// =============================================================================
// Main
// =============================================================================

/// Runs one batch and returns the archive path, or `None` on a dry run.
fn run(args: &Args) -> Result<Option<PathBuf>> {
    println!("=== Gerador de XML de Moradias ===");
    println!("Input: {}", args.input.display());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let table = load_csv(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    for line in describe_table(&table) {
        println!("{line}");
    }

    if args.dry_run {
        let built = build_documents(&table, &SystemClock).context("Failed to build documents")?;
        print_log(&built.log.join("\n"));
        println!(
            "\nDry run - {} documents built for station {}, no archive written",
            built.documents.len(),
            built.station
        );
        return Ok(None);
    }

    let report = process_table(&table, &args.batch_options(), &SystemClock)
        .context("Failed to generate archive")?;
    print_log(&report.log);

    println!("\n=== Generation Complete ===");
    println!("Records: {}", report.row_count);
    println!("Archive: {}", report.archive_path.display());
    info!(archive = %report.archive_path.display(), rows = report.row_count, "done");
    Ok(Some(report.archive_path))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_config = LogConfig::from_verbosity(args.verbose)
        .with_format(args.log_format)
        .with_target(args.verbose > 0);
    init_logging(&log_config).context("Failed to initialize logging")?;

    run(&args)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
