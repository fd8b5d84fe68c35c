//! Run summaries

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use testcov_core::{TestResult, TestStatus};

/// Aggregated outcome of a test run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Per-test results, in execution order
    pub results: Vec<TestResult>,
    /// Passed count
    pub passed: usize,
    /// Failed count
    pub failed: usize,
    /// Errored count
    pub errored: usize,
    /// Skipped count
    pub skipped: usize,
    /// Summed test durations
    pub duration: Duration,
}

impl RunSummary {
    /// Summarize a set of results
    #[must_use]
    pub fn from_results(results: impl IntoIterator<Item = TestResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.push(result);
        }
        summary
    }

    /// Add one result
    pub fn push(&mut self, result: TestResult) {
        match result.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Errored => self.errored += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
        self.duration += result.duration;
        self.results.push(result);
    }

    /// Number of results
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// No test failed or errored
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Results that were not a pass
    pub fn not_passed(&self) -> impl Iterator<Item = &TestResult> {
        self.results
            .iter()
            .filter(|r| r.status != TestStatus::Passed)
    }

    /// One line per result: `PASSED a.rs:3::name`
    #[must_use]
    pub fn render_results(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            out.push_str(&format!(
                "{:<8} {}::{}\n",
                result.status.label(),
                result.location,
                result.name
            ));
        }
        out
    }

    /// Short summary: non-passing results, then the totals line
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut details = self.not_passed().peekable();
        if details.peek().is_some() {
            out.push_str("short test summary info\n");
            for result in details {
                out.push_str(&format!(
                    "{} {}::{}",
                    result.status.label(),
                    result.location,
                    result.name
                ));
                if let Some(detail) = &result.detail {
                    out.push_str(" - ");
                    out.push_str(detail);
                }
                out.push('\n');
            }
        }
        out.push_str(&self.totals_line());
        out.push('\n');
        out
    }

    fn totals_line(&self) -> String {
        format!(
            "{} passed, {} failed, {} errored, {} skipped in {:.2}s",
            self.passed,
            self.failed,
            self.errored,
            self.skipped,
            self.duration.as_secs_f64()
        )
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

impl FromIterator<TestResult> for RunSummary {
    fn from_iter<I: IntoIterator<Item = TestResult>>(iter: I) -> Self {
        Self::from_results(iter)
    }
}
