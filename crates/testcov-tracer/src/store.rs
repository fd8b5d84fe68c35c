//! Coverage data files
//!
//! One JSON file per run, at a path chosen by configuration. The record is
//! wrapped in an envelope carrying a format version, a run id, a timestamp
//! and a SHA-256 checksum of the record's canonical JSON; loading verifies
//! both version and checksum before the record is trusted.
//!
//! Writes go to a temporary file in the destination directory which is
//! then renamed over the target, so a crash never leaves a torn file.

use crate::record::CoverageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use testcov_core::HarnessError;
use uuid::Uuid;

/// Current data file format
pub const FORMAT_VERSION: u32 = 1;

/// On-disk envelope around a [`CoverageRecord`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFile {
    /// Format version, see [`FORMAT_VERSION`]
    pub format_version: u32,
    /// Unique id of the run that wrote the file
    pub run_id: Uuid,
    /// Write time
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the record's canonical JSON
    pub checksum: String,
    /// The coverage data
    pub record: CoverageRecord,
}

impl DataFile {
    /// Wrap a record for writing
    ///
    /// # Errors
    /// Returns `HarnessError::Encoding` if the record cannot be serialized.
    pub fn seal(record: CoverageRecord) -> Result<Self, HarnessError> {
        Ok(Self {
            format_version: FORMAT_VERSION,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            checksum: checksum(&record)?,
            record,
        })
    }

    /// Check version and checksum
    ///
    /// # Errors
    /// Returns `HarnessError::CorruptData` naming `path` on any mismatch.
    pub fn verify(&self, path: &Path) -> Result<(), HarnessError> {
        if self.format_version != FORMAT_VERSION {
            return Err(HarnessError::corrupt(
                path,
                format!(
                    "unsupported format version {} (expected {FORMAT_VERSION})",
                    self.format_version
                ),
            ));
        }
        if checksum(&self.record)? != self.checksum {
            return Err(HarnessError::corrupt(path, "checksum mismatch"));
        }
        Ok(())
    }
}

/// Hex SHA-256 of a record's canonical JSON encoding
///
/// # Errors
/// Returns `HarnessError::Encoding` if the record cannot be serialized.
pub fn checksum(record: &CoverageRecord) -> Result<String, HarnessError> {
    let bytes = serde_json::to_vec(record)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Read and verify a data file
///
/// # Errors
/// - `HarnessError::NoCoverageData` if the file does not exist
/// - `HarnessError::Load` for other read failures
/// - `HarnessError::CorruptData` if it does not parse or verify
pub fn load_file(path: &Path) -> Result<CoverageRecord, HarnessError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => HarnessError::NoCoverageData {
            path: path.to_path_buf(),
        },
        _ => HarnessError::Load {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let data: DataFile = serde_json::from_slice(&bytes)
        .map_err(|e| HarnessError::corrupt(path, format!("not a testcov data file: {e}")))?;
    data.verify(path)?;
    Ok(data.record)
}

/// Atomically write a record to `path`
///
/// # Errors
/// Returns `HarnessError::Persistence` if the destination is unwritable.
pub fn write_file(path: &Path, record: &CoverageRecord) -> Result<(), HarnessError> {
    let data = DataFile::seal(record.clone())?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|source| HarnessError::persistence(path, source))?;
    serde_json::to_writer_pretty(&mut tmp, &data)
        .map_err(|e| HarnessError::persistence(path, e.into()))?;
    tmp.write_all(b"\n")
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|source| HarnessError::persistence(path, source))?;
    tmp.persist(path)
        .map_err(|e| HarnessError::persistence(path, e.error))?;

    tracing::debug!(path = %path.display(), run_id = %data.run_id, "coverage data written");
    Ok(())
}

/// Merge several data files into one
///
/// # Errors
/// Propagates load failures of any input and persistence failure of the output.
pub fn combine(inputs: &[PathBuf], output: &Path) -> Result<CoverageRecord, HarnessError> {
    let mut combined = CoverageRecord::new();
    for input in inputs {
        combined.merge(&load_file(input)?);
    }
    write_file(output, &combined)?;
    tracing::info!(
        inputs = inputs.len(),
        output = %output.display(),
        "combined coverage data"
    );
    Ok(combined)
}

/// Location and write mode of a run's coverage data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageStore {
    path: PathBuf,
    append: bool,
}

impl CoverageStore {
    /// Store that replaces `path` on every save
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
        }
    }

    /// With append mode: saves merge into the existing file
    #[inline]
    #[must_use]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Data file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether saves merge into existing data
    #[inline]
    #[must_use]
    pub fn is_append(&self) -> bool {
        self.append
    }

    /// Persist a record, returning what was written
    ///
    /// # Errors
    /// Returns `HarnessError::Persistence` if writing fails, or a load error
    /// if append mode finds an unreadable existing file.
    pub fn save(&self, record: &CoverageRecord) -> Result<CoverageRecord, HarnessError> {
        let to_write = if self.append && self.path.exists() {
            load_file(&self.path)?.merged(record)
        } else {
            record.clone()
        };
        write_file(&self.path, &to_write)?;
        Ok(to_write)
    }

    /// Load the stored record
    ///
    /// # Errors
    /// See [`load_file`].
    pub fn load(&self) -> Result<CoverageRecord, HarnessError> {
        load_file(&self.path)
    }
}
