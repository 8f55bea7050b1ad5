//! Error types for the edificio batch pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the core library.
pub type Result<T> = std::result::Result<T, GeradorError>;

/// Errors that abort a batch. No variant is retried.
#[derive(Debug, Error)]
pub enum GeradorError {
    // === Loading ===
    /// The input file could not be read.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoded text is not a parseable `;`-delimited CSV.
    #[error("failed to parse CSV decoded as {encoding}: {source}")]
    Load {
        encoding: &'static str,
        #[source]
        source: csv::Error,
    },

    /// A data record has more fields than the header.
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The CSV has a header but no data rows.
    #[error("CSV file has no data rows")]
    EmptyInput,

    // === Mapping ===
    /// A column without a default is absent or null.
    #[error("row {row}: required column '{column}' is missing")]
    MissingRequiredField { row: usize, column: &'static str },

    /// A column has a value that cannot be converted.
    #[error("row {row}: invalid {column} value '{value}'")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    // === Output ===
    /// The XML writer failed.
    #[error("failed to write XML: {0}")]
    Xml(String),

    /// Filesystem failure while staging or archiving.
    #[error("failed to write {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP writer failed.
    #[error("failed to build ZIP {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl GeradorError {
    /// True when the batch failed because of the uploaded data rather than the host.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Load { .. }
                | Self::TooManyFields { .. }
                | Self::EmptyInput
                | Self::MissingRequiredField { .. }
                | Self::InvalidField { .. }
        )
    }

    /// Message shown to the person who uploaded the file.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::FileRead { .. } => "Não foi possível ler o arquivo enviado".to_string(),
            Self::Load { source, .. } => format!("Erro ao ler o arquivo CSV: {source}"),
            Self::TooManyFields {
                line,
                expected,
                found,
            } => format!("Erro ao ler o arquivo CSV: linha {line} tem {found} campos, esperados {expected}"),
            Self::EmptyInput => "O arquivo CSV está vazio".to_string(),
            Self::MissingRequiredField { row, column } => {
                format!("Registro {row}: coluna obrigatória {column} ausente")
            }
            Self::InvalidField { row, column, value } => {
                format!("Registro {row}: valor inválido para {column}: '{value}'")
            }
            Self::Xml(_) | Self::ArchiveWrite { .. } | Self::Zip { .. } => {
                "Falha ao gerar o arquivo ZIP".to_string()
            }
        }
    }
}
