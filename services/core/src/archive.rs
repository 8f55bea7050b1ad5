//! Staging and ZIP packaging of generated documents, plus the stale-archive sweep.
//!
//! Each document lands in `moradia{i}/moradia{i}.xml` under a per-run staging
//! root. The root is zipped with entries relative to it and then removed, on
//! success and on failure alike. Archives are created exclusively and never
//! overwrite an existing file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{GeradorError, Result};

pub const ARCHIVE_PREFIX: &str = "moradias_xml";
pub const UNKNOWN_STATION: &str = "DESCONHECIDA";
pub const FOLDER_PREFIX: &str = "moradia";

/// One serialized document and its 1-based position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub index: usize,
    pub xml: Vec<u8>,
}

/// Folder (and file stem) of document `index`.
pub fn folder_name(index: usize) -> String {
    format!("{FOLDER_PREFIX}{index}")
}

/// Path of document `index` inside the archive.
pub fn entry_name(index: usize) -> String {
    let folder = folder_name(index);
    format!("{folder}/{folder}.xml")
}

/// Replace anything but ASCII letters, digits, `-` and `_` with `_`.
///
/// A missing or blank station becomes [`UNKNOWN_STATION`].
pub fn sanitize_station(station: Option<&str>) -> String {
    let trimmed = station.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return UNKNOWN_STATION.to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Names tried per batch before giving up on a free one.
pub const MAX_NAME_ATTEMPTS: usize = 100;

/// `moradias_xml_{station}_{timestamp}.zip`
pub fn archive_file_name(station: &str, timestamp: &str) -> String {
    format!("{ARCHIVE_PREFIX}_{station}_{timestamp}.zip")
}

/// Name for the `attempt`-th try: the plain name first, then `_{attempt}` before `.zip`.
pub fn numbered_archive_file_name(station: &str, timestamp: &str, attempt: usize) -> String {
    if attempt <= 1 {
        archive_file_name(station, timestamp)
    } else {
        format!("{ARCHIVE_PREFIX}_{station}_{timestamp}_{attempt}.zip")
    }
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> GeradorError + '_ {
    move |source| GeradorError::ArchiveWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `documents` to the first free name in `output_dir` for this station and timestamp.
///
/// Returns the base name and full path of the archive. Existing files are never
/// touched, so concurrent batches stamped with the same second get distinct names.
pub fn write_unique_archive(
    documents: &[Document],
    output_dir: &Path,
    station: &str,
    timestamp: &str,
    staging_parent: &Path,
) -> Result<(String, PathBuf)> {
    let mut attempt = 1;
    loop {
        let name = numbered_archive_file_name(station, timestamp, attempt);
        let path = output_dir.join(&name);
        match write_archive(documents, &path, staging_parent) {
            Ok(()) => return Ok((name, path)),
            Err(GeradorError::ArchiveWrite { path: taken, source })
                if taken == path
                    && source.kind() == io::ErrorKind::AlreadyExists
                    && attempt < MAX_NAME_ATTEMPTS =>
            {
                debug!(archive = %taken.display(), "archive name taken, trying next suffix");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Stage `documents` under a fresh directory in `staging_parent` and zip them to `archive_path`.
///
/// `archive_path` must not exist yet; an existing file fails with an
/// `AlreadyExists` [`GeradorError::ArchiveWrite`] and is left as it was. On any
/// later error the archive this call created is removed. The staging directory
/// is always removed.
pub fn write_archive(documents: &[Document], archive_path: &Path, staging_parent: &Path) -> Result<()> {
    let file = File::options()
        .write(true)
        .create_new(true)
        .open(archive_path)
        .map_err(write_error(archive_path))?;

    let result = stage_and_zip(file, documents, archive_path, staging_parent);
    if result.is_err() {
        if let Err(e) = fs::remove_file(archive_path) {
            warn!(path = %archive_path.display(), error = %e, "failed to remove partial archive");
        }
    }

    result?;
    info!(
        archive = %archive_path.display(),
        entries = documents.len(),
        "archive written"
    );
    Ok(())
}

fn stage_and_zip(file: File, documents: &[Document], archive_path: &Path, staging_parent: &Path) -> Result<()> {
    let stem = archive_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(ARCHIVE_PREFIX);

    let staging = tempfile::Builder::new()
        .prefix(&format!("{stem}_"))
        .tempdir_in(staging_parent)
        .map_err(write_error(staging_parent))?;
    debug!(staging = %staging.path().display(), "created staging root");

    let result = stage_documents(staging.path(), documents)
        .and_then(|()| zip_staging(file, staging.path(), documents, archive_path));

    let staging_path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        warn!(staging = %staging_path.display(), error = %e, "failed to remove staging root");
    }
    result
}

fn stage_documents(root: &Path, documents: &[Document]) -> Result<()> {
    for doc in documents {
        let folder = root.join(folder_name(doc.index));
        fs::create_dir_all(&folder).map_err(write_error(&folder))?;
        let file = folder.join(format!("{}.xml", folder_name(doc.index)));
        fs::write(&file, &doc.xml).map_err(write_error(&file))?;
    }
    Ok(())
}

fn zip_staging(file: File, root: &Path, documents: &[Document], archive_path: &Path) -> Result<()> {
    let zip_error = |source: zip::result::ZipError| GeradorError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for doc in documents {
        let name = entry_name(doc.index);
        let staged: PathBuf = root.join(&name);
        zip.start_file(name, options).map_err(zip_error)?;
        let mut source = File::open(&staged).map_err(write_error(&staged))?;
        io::copy(&mut source, &mut zip).map_err(write_error(archive_path))?;
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

/// Delete regular files in `dir` whose modification age is strictly greater than `max_age`.
///
/// Returns how many files were removed. A missing directory counts as empty.
pub fn sweep_stale_archives(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat file");
                continue;
            }
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed stale file");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale file"),
        }
    }

    if removed > 0 {
        info!(dir = %dir.display(), removed, "stale files swept");
    }
    Ok(removed)
}
