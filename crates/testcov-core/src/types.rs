//! Core data model
//!
//! Plain values passed between the runner, tracer and reporter. Everything
//! here is immutable once constructed and cheap to clone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Name of the well-known authentication token parameter
pub const TOKEN_PARAM: &str = "token";

/// Source location of a test case
///
/// Ordered by file, then line, which is what makes discovery order stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Source file path as reported by `file!()`
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

impl Location {
    /// Create a new location
    #[inline]
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A coverage site inside one source file
///
/// Either a plain line, or one arm of a branch anchored on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Site {
    /// 1-based line number
    pub line: u32,
    /// Branch arm index, `None` for a line site
    pub branch: Option<u32>,
}

impl Site {
    /// Line site
    #[inline]
    #[must_use]
    pub const fn line(line: u32) -> Self {
        Self { line, branch: None }
    }

    /// Branch arm site
    #[inline]
    #[must_use]
    pub const fn branch(line: u32, arm: u32) -> Self {
        Self {
            line,
            branch: Some(arm),
        }
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(arm) => write!(f, "{}->{}", self.line, arm),
            None => write!(f, "{}", self.line),
        }
    }
}

/// Outcome classification of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// All assertions held
    Passed,
    /// An assertion did not hold
    Failed,
    /// Unexpected fault during setup or execution
    Errored,
    /// Not executed (e.g. a required parameter was absent)
    Skipped,
}

impl TestStatus {
    /// Whether this outcome makes the run unsuccessful
    #[inline]
    #[must_use]
    pub fn is_unsuccessful(self) -> bool {
        matches!(self, Self::Failed | Self::Errored)
    }

    /// Short uppercase label used in terminal output
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Errored => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }
}

/// Result of executing one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Where the test is declared
    pub location: Location,
    /// Outcome
    pub status: TestStatus,
    /// Wall-clock time spent in setup and execution
    pub duration: Duration,
    /// Failure, error or skip detail
    pub detail: Option<String>,
}

impl TestResult {
    /// Create a passed result
    #[must_use]
    pub fn passed(name: impl Into<String>, location: Location, duration: Duration) -> Self {
        Self {
            name: name.into(),
            location,
            status: TestStatus::Passed,
            duration,
            detail: None,
        }
    }

    /// Create a failed result
    #[cold]
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        location: Location,
        duration: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            status: TestStatus::Failed,
            duration,
            detail: Some(detail.into()),
        }
    }

    /// Create an errored result
    #[cold]
    #[must_use]
    pub fn errored(
        name: impl Into<String>,
        location: Location,
        duration: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            status: TestStatus::Errored,
            duration,
            detail: Some(detail.into()),
        }
    }

    /// Create a skipped result
    #[cold]
    #[must_use]
    pub fn skipped(name: impl Into<String>, location: Location, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location,
            status: TestStatus::Skipped,
            duration: Duration::ZERO,
            detail: Some(reason.into()),
        }
    }
}

/// Named runtime parameters forwarded to tests
///
/// Values are secrets more often than not, so `Debug` only prints names.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RunParameters {
    values: BTreeMap<String, String>,
}

impl RunParameters {
    /// Create an empty parameter set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the authentication token
    #[inline]
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.with(TOKEN_PARAM, token)
    }

    /// With an arbitrary named parameter
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a parameter
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The authentication token, if supplied
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_PARAM)
    }

    /// Whether a parameter is present and non-empty
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    /// Names of the supplied parameters
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for RunParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_orders_by_file_then_line() {
        let mut locations = vec![
            Location::new("b.rs", 1),
            Location::new("a.rs", 20),
            Location::new("a.rs", 3),
        ];
        locations.sort();

        assert_eq!(locations[0], Location::new("a.rs", 3));
        assert_eq!(locations[1], Location::new("a.rs", 20));
        assert_eq!(locations[2], Location::new("b.rs", 1));
        assert_eq!(locations[0].to_string(), "a.rs:3");
    }

    #[test]
    fn site_display() {
        assert_eq!(Site::line(7).to_string(), "7");
        assert_eq!(Site::branch(7, 1).to_string(), "7->1");
    }

    #[test]
    fn unsuccessful_statuses() {
        assert!(TestStatus::Failed.is_unsuccessful());
        assert!(TestStatus::Errored.is_unsuccessful());
        assert!(!TestStatus::Passed.is_unsuccessful());
        assert!(!TestStatus::Skipped.is_unsuccessful());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TestStatus::Errored).unwrap();
        assert_eq!(json, "\"errored\"");
    }

    #[test]
    fn parameters_debug_redacts_values() {
        let params = RunParameters::new().with_token("hunter2");

        assert_eq!(params.token(), Some("hunter2"));
        let printed = format!("{params:?}");
        assert!(printed.contains("token"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn empty_parameter_counts_as_absent() {
        let params = RunParameters::new().with_token("");
        assert!(!params.has(TOKEN_PARAM));
        assert!(!RunParameters::new().has(TOKEN_PARAM));
    }

    #[test]
    fn skipped_result_has_zero_duration() {
        let result = TestResult::skipped("t", Location::new("a.rs", 1), "no token");
        assert_eq!(result.duration, Duration::ZERO);
        assert_eq!(result.detail.as_deref(), Some("no token"));
    }
}
