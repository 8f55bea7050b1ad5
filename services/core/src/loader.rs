//! CSV loading with encoding fallback.
//!
//! Survey exports arrive as `;`-delimited CSV in whatever encoding the
//! spreadsheet tool produced. Candidates are tried in a fixed order and the
//! first strict decode wins; if none succeeds the bytes are decoded lossily as
//! UTF-8. Latin-1 maps every byte to the code point of the same value, so in
//! practice the chain stops there. Cells holding a null token are dropped so
//! that every accessor sees them as missing.
//!
//! Records shorter than the header leave their trailing columns missing.
//! Records longer than the header are rejected.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use encoding_rs::{mem::decode_latin1, Encoding, UTF_8, WINDOWS_1252};
use tracing::{debug, info, warn};

use crate::error::{GeradorError, Result};

/// Field delimiter of survey exports.
pub const DELIMITER: u8 = b';';

/// Label reported when no candidate encoding decodes the file.
pub const FALLBACK_ENCODING: &str = "platform-default";

/// Cell values treated as null.
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How a candidate turns bytes into text.
#[derive(Clone, Copy)]
enum Decoder {
    /// Strict decode with an `encoding_rs` encoding.
    Strict(&'static Encoding),
    /// Byte value = code point.
    Latin1,
}

impl Decoder {
    fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            Self::Strict(encoding) => encoding.decode_without_bom_handling_and_without_replacement(bytes),
            Self::Latin1 => Some(decode_latin1(bytes)),
        }
    }
}

/// Encodings tried in order. Latin-1 accepts any input, so the last two
/// labels are only reached if it is removed.
fn candidate_encodings() -> [(&'static str, Decoder); 4] {
    [
        ("utf-8", Decoder::Strict(UTF_8)),
        ("latin-1", Decoder::Latin1),
        ("iso-8859-1", Decoder::Latin1),
        ("cp1252", Decoder::Strict(WINDOWS_1252)),
    ]
}

/// Returns true when `value` is one of [`NULL_TOKENS`].
pub fn is_null(value: &str) -> bool {
    NULL_TOKENS.contains(&value)
}

/// One CSV record keyed by column name. Null cells are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    values: HashMap<String, String>,
}

impl InputRow {
    /// Build a row from `(column, value)` pairs, dropping null cells.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut values = HashMap::new();
        for (column, value) in pairs {
            let value = value.as_ref();
            if is_null(value) {
                continue;
            }
            values
                .entry(column.into())
                .or_insert_with(|| value.to_string());
        }
        Self { values }
    }

    fn from_record(headers: &[String], record: &csv::StringRecord) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .map(String::as_str)
                .zip(record.iter()),
        )
    }

    /// Raw value of `column`, or `None` when absent or null.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Raw value of `column`, or `default` when absent or null.
    pub fn get_or<'a>(&'a self, column: &str, default: &'a str) -> &'a str {
        self.get(column).unwrap_or(default)
    }
}

/// A decoded CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    /// Label of the encoding that decoded the file.
    pub encoding: &'static str,
    pub headers: Vec<String>,
    pub rows: Vec<InputRow>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Load a survey CSV from disk.
pub fn load_csv(path: &Path) -> Result<CsvTable> {
    let bytes = std::fs::read(path).map_err(|source| GeradorError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read CSV file");
    parse_csv_bytes(&bytes)
}

/// Decode and parse raw CSV bytes.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<CsvTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let (encoding, text) = decode(bytes);

    let (headers, rows) = parse_csv_text(&text, encoding)?;

    if rows.is_empty() {
        return Err(GeradorError::EmptyInput);
    }

    info!(encoding, rows = rows.len(), columns = headers.len(), "CSV loaded");
    Ok(CsvTable {
        encoding,
        headers,
        rows,
    })
}

fn decode(bytes: &[u8]) -> (&'static str, Cow<'_, str>) {
    for (label, decoder) in candidate_encodings() {
        match decoder.decode(bytes) {
            Some(text) => return (label, text),
            None => debug!(encoding = label, "decode failed, trying next encoding"),
        }
    }
    warn!("no candidate encoding decoded the file, falling back to lossy UTF-8");
    (FALLBACK_ENCODING, String::from_utf8_lossy(bytes))
}

fn parse_csv_text(text: &str, encoding: &'static str) -> Result<(Vec<String>, Vec<InputRow>)> {
    let load_error = |source| GeradorError::Load { encoding, source };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(load_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(load_error)?;
        if record.len() > headers.len() {
            return Err(GeradorError::TooManyFields {
                line: record.position().map_or(0, csv::Position::line),
                expected: headers.len(),
                found: record.len(),
            });
        }
        rows.push(InputRow::from_record(&headers, &record));
    }
    Ok((headers, rows))
}
