//! Machine-readable summaries

use crate::summary::CoverageSummary;
use std::path::Path;
use testcov_core::HarnessError;

/// Pretty-printed JSON for a summary
///
/// # Errors
/// Returns `HarnessError::Encoding` if serialization fails.
pub fn to_json(summary: &CoverageSummary) -> Result<String, HarnessError> {
    let mut text = serde_json::to_string_pretty(summary)?;
    text.push('\n');
    Ok(text)
}

/// Write a summary as JSON to `path`
///
/// # Errors
/// Returns `HarnessError::Report` if the file cannot be written.
pub fn write_json(summary: &CoverageSummary, path: &Path) -> Result<(), HarnessError> {
    let text = to_json(summary)?;
    std::fs::write(path, text).map_err(|source| HarnessError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "coverage summary written");
    Ok(())
}
