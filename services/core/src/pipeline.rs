//! CSV → ZIP batch.
//!
//! Every row is mapped before anything is written, so a bad row aborts the
//! batch without leaving files behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, info_span};

use crate::archive::{sanitize_station, write_unique_archive, Document};
use crate::clock::{Clock, SystemClock};
use crate::complement::{complement_code, extract_argument};
use crate::error::{GeradorError, Result};
use crate::loader::{load_csv, CsvTable, InputRow};
use crate::mapper::{columns, map_row, BuildingRecord};
use crate::xml::to_xml;

/// Separator closing each entry of the processing log.
pub const LOG_SEPARATOR: &str = "--------------------------------------------------";

/// Where the archive goes and where documents are staged first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl BatchOptions {
    /// Stage under the system temp dir.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            staging_dir: std::env::temp_dir(),
        }
    }

    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }
}

/// Outcome of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Base filename of the archive.
    pub archive_name: String,
    pub archive_path: PathBuf,
    pub row_count: usize,
    /// Processing log lines joined with `\n`.
    pub log: String,
}

/// Serialized documents of a batch, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct BuiltBatch {
    pub documents: Vec<Document>,
    pub log: Vec<String>,
    /// Sanitized station of the first row.
    pub station: String,
}

/// Row 1 and every 10th row are logged.
pub fn should_log(index: usize) -> bool {
    index == 1 || index % 10 == 0
}

fn complement_line(label: &str, raw: Option<&str>) -> String {
    format!(
        "  {label}(\"{}\" → código:{} argumento:\"{}\")",
        raw.unwrap_or_default(),
        complement_code(raw),
        extract_argument(raw)
    )
}

/// Log entry of one row: header, one line per complement slot, separator.
pub fn log_entry(index: usize, row: &InputRow) -> [String; 5] {
    [
        format!("Registro {index}:"),
        complement_line("COMP1", row.get(columns::COMPLEMENTO)),
        complement_line("COMP2", row.get(columns::COMPLEMENTO2)),
        complement_line("RESULT", row.get(columns::RESULTADO)),
        LOG_SEPARATOR.to_string(),
    ]
}

/// Map and serialize every row of `table` without touching the filesystem.
pub fn build_documents(table: &CsvTable, clock: &dyn Clock) -> Result<BuiltBatch> {
    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| map_row(row, i + 1, clock))
        .collect::<Result<Vec<BuildingRecord>>>()?;

    let mut documents = Vec::with_capacity(records.len());
    let mut log = Vec::new();
    for (i, (row, record)) in table.rows.iter().zip(&records).enumerate() {
        let index = i + 1;
        documents.push(Document {
            index,
            xml: to_xml(record)?,
        });
        if should_log(index) {
            log.extend(log_entry(index, row));
        }
    }

    let station = sanitize_station(
        table
            .rows
            .first()
            .and_then(|row| row.get(columns::ESTACAO_ABASTECEDORA)),
    );

    Ok(BuiltBatch {
        documents,
        log,
        station,
    })
}

/// Build the archive for an already loaded table.
///
/// Batches that share a station and a timestamp get `_2`, `_3`, ... suffixes
/// instead of replacing each other's archives.
pub fn process_table(table: &CsvTable, options: &BatchOptions, clock: &dyn Clock) -> Result<BatchReport> {
    let built = build_documents(table, clock)?;

    fs::create_dir_all(&options.output_dir).map_err(|source| GeradorError::ArchiveWrite {
        path: options.output_dir.clone(),
        source,
    })?;

    let (archive_name, archive_path) = write_unique_archive(
        &built.documents,
        &options.output_dir,
        &built.station,
        &clock.timestamp(),
        &options.staging_dir,
    )?;

    Ok(BatchReport {
        archive_name,
        archive_path,
        row_count: built.documents.len(),
        log: built.log.join("\n"),
    })
}

/// Load `path` and build its archive with the system clock.
pub fn process_csv(path: &Path, options: &BatchOptions) -> Result<BatchReport> {
    let _span = info_span!("batch", input = %path.display()).entered();
    let table = load_csv(path)?;
    let report = process_table(&table, options, &SystemClock)?;
    info!(
        rows = report.row_count,
        archive = %report.archive_name,
        "batch finished"
    );
    Ok(report)
}
