//! Terminal coverage table

use crate::summary::CoverageSummary;

/// Table rendering switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Add a `Missing` column
    pub show_missing: bool,
    /// Omit fully covered files
    pub skip_covered: bool,
}

impl TableOptions {
    /// With the `Missing` column
    #[inline]
    #[must_use]
    pub fn with_show_missing(mut self, show: bool) -> Self {
        self.show_missing = show;
        self
    }

    /// Omitting fully covered files
    #[inline]
    #[must_use]
    pub fn with_skip_covered(mut self, skip: bool) -> Self {
        self.skip_covered = skip;
        self
    }
}

/// Whole-number percentage for display
///
/// Never shows `0%` for some coverage or `100%` for incomplete coverage.
#[must_use]
pub fn display_percent(percent: f64) -> String {
    format!("{:.0}%", rounded_percent(percent))
}

/// Whole percentage shown for `percent`
///
/// Only exactly 0 shows as 0 and only exactly 100 shows as 100.
#[must_use]
pub fn rounded_percent(percent: f64) -> f64 {
    if percent > 0.0 && percent < 1.0 {
        1.0
    } else if percent > 99.0 && percent < 100.0 {
        99.0
    } else {
        percent.round()
    }
}

/// Render a summary as a fixed-width table
///
/// ```text
/// Name     Sites   Miss  Cover
/// ----------------------------
/// src/a.rs     4      1    75%
/// ----------------------------
/// TOTAL        4      1    75%
/// ```
#[must_use]
pub fn render_table(summary: &CoverageSummary, options: TableOptions) -> String {
    let shown: Vec<_> = summary
        .files
        .iter()
        .filter(|f| !(options.skip_covered && f.is_complete()))
        .collect();
    let skipped = summary.files.len() - shown.len();

    let width = shown
        .iter()
        .map(|f| f.path.len())
        .chain(["Name".len(), "TOTAL".len()])
        .max()
        .unwrap_or_default();

    let row = |name: &str, sites: usize, missed: usize, percent: f64, missing: Option<&str>| {
        let mut line = format!(
            "{name:<width$} {sites:>6} {missed:>6} {:>6}",
            display_percent(percent)
        );
        if let Some(missing) = missing {
            line.push_str("   ");
            line.push_str(missing);
        }
        line.trim_end().to_string()
    };

    let mut header = format!("{:<width$} {:>6} {:>6} {:>6}", "Name", "Sites", "Miss", "Cover");
    if options.show_missing {
        header.push_str("   Missing");
    }
    let rule = "-".repeat(header.len());

    let mut lines = vec![header, rule.clone()];
    for file in &shown {
        let missing = options.show_missing.then_some(file.missing.as_str());
        lines.push(row(&file.path, file.sites, file.missed, file.percent, missing));
    }
    lines.push(rule);
    let totals = &summary.totals;
    lines.push(row("TOTAL", totals.sites, totals.missed, totals.percent, None));

    if skipped > 0 {
        let noun = if skipped == 1 { "file" } else { "files" };
        lines.push(String::new());
        lines.push(format!("{skipped} {noun} skipped due to complete coverage."));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
