//! Coverage summaries
//!
//! A site is one executable line or one branch arm. A file's percentage
//! is covered sites over known sites; a file (or total) with no known
//! sites is reported as fully covered.

use serde::{Deserialize, Serialize};
use testcov_core::Site;
use testcov_tracer::{CoverageRecord, FileRecord};

/// Coverage of one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Source path as recorded
    pub path: String,
    /// Known sites
    pub sites: usize,
    /// Sites hit at least once
    pub covered: usize,
    /// Sites never hit
    pub missed: usize,
    /// `covered / sites * 100`
    pub percent: f64,
    /// Line sites never hit, ascending
    pub missing_lines: Vec<u32>,
    /// Branch arms never taken, ascending
    pub partial_branches: Vec<Site>,
    /// Missing lines collapsed into ranges, then untaken branch arms
    ///
    /// Consecutive missed line sites form one range even when non-site
    /// lines sit between them: `3-5, 9, 7->1`.
    pub missing: String,
}

impl FileCoverage {
    /// Summarize one file's record
    #[must_use]
    pub fn from_record(path: &str, record: &FileRecord) -> Self {
        let mut covered = 0;
        let mut missing_lines = Vec::new();
        let mut partial_branches = Vec::new();
        let mut line_hits = Vec::new();

        for (site, hits) in record.sites() {
            let hit = hits > 0;
            if hit {
                covered += 1;
            }
            match site.branch {
                None => {
                    line_hits.push((site.line, hit));
                    if !hit {
                        missing_lines.push(site.line);
                    }
                }
                Some(_) if !hit => partial_branches.push(site),
                Some(_) => {}
            }
        }

        let mut parts = collapse_ranges(&line_hits);
        parts.extend(partial_branches.iter().map(ToString::to_string));

        let sites = record.site_count();
        Self {
            path: path.to_string(),
            sites,
            covered,
            missed: sites - covered,
            percent: percent(covered, sites),
            missing_lines,
            partial_branches,
            missing: parts.join(", "),
        }
    }

    /// Whether every site was hit
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missed == 0
    }
}

/// Whole-run totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTotals {
    /// Files in the merged record
    pub files: usize,
    /// Known sites
    pub sites: usize,
    /// Sites hit at least once
    pub covered: usize,
    /// Sites never hit
    pub missed: usize,
    /// `covered / sites * 100`
    pub percent: f64,
}

/// Per-file and total coverage for a merged record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Files in path order
    pub files: Vec<FileCoverage>,
    /// Totals across all files
    pub totals: CoverageTotals,
}

impl CoverageSummary {
    /// Summarize a record
    #[must_use]
    pub fn from_record(record: &CoverageRecord) -> Self {
        let files: Vec<_> = record
            .files()
            .map(|(path, file)| FileCoverage::from_record(path, file))
            .collect();
        let sites = files.iter().map(|f| f.sites).sum();
        let covered = files.iter().map(|f| f.covered).sum();

        Self {
            totals: CoverageTotals {
                files: files.len(),
                sites,
                covered,
                missed: sites - covered,
                percent: percent(covered, sites),
            },
            files,
        }
    }

    /// Total percentage
    #[inline]
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.totals.percent
    }

    /// Whether the total reaches `fail_under`
    #[inline]
    #[must_use]
    pub fn meets(&self, fail_under: f64) -> bool {
        self.totals.percent >= fail_under
    }

    /// Look up one file
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Merge `records` additively and summarize the result
///
/// Pure: the same inputs always produce the same summary.
#[must_use]
pub fn report(records: &[CoverageRecord]) -> CoverageSummary {
    let merged = CoverageRecord::merge_all(records);
    let summary = CoverageSummary::from_record(&merged);
    tracing::debug!(
        inputs = records.len(),
        files = summary.totals.files,
        percent = summary.totals.percent,
        "coverage summarized"
    );
    summary
}

/// `covered / sites * 100`, or 100 when there is nothing to cover
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(covered: usize, sites: usize) -> f64 {
    if sites == 0 {
        100.0
    } else {
        covered as f64 / sites as f64 * 100.0
    }
}

fn collapse_ranges(line_hits: &[(u32, bool)]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut run: Option<(u32, u32)> = None;

    for &(line, hit) in line_hits {
        match (hit, run) {
            (false, Some((start, _))) => run = Some((start, line)),
            (false, None) => run = Some((line, line)),
            (true, Some(span)) => {
                parts.push(format_span(span));
                run = None;
            }
            (true, None) => {}
        }
    }
    if let Some(span) = run {
        parts.push(format_span(span));
    }
    parts
}

fn format_span((start, end): (u32, u32)) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}
