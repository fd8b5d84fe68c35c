//! Harness configuration
//!
//! Loaded from a TOML file with `[runner]`, `[coverage]` and `[badge]`
//! tables. Every field has a default, so an empty file (or no file) is a
//! valid configuration. The coverage data location is plain configuration,
//! never an implicit process-wide convention.
//!
//! ```toml
//! [runner]
//! jobs = 4
//! missing_parameter = "skip"
//!
//! [coverage]
//! data_file = "target/.testcov.json"
//! fail_under = 75.0
//!
//! [badge.thresholds]
//! medium = 60.0
//! high = 80.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name probed when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "testcov.toml";

/// Default coverage data file
pub const DEFAULT_DATA_FILE: &str = ".testcov.json";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser diagnostic
        #[source]
        source: toml::de::Error,
    },

    /// Values parsed but are inconsistent
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// What to do with a test whose required parameter was not supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParameterPolicy {
    /// Record the test as skipped
    #[default]
    Skip,
    /// Record the test as errored
    Error,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Test runner settings
    pub runner: RunnerConfig,
    /// Coverage tracer and reporter settings
    pub coverage: CoverageConfig,
    /// Badge generator settings
    pub badge: BadgeConfig,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input and
    /// `ConfigError::Invalid` when [`validate`](Self::validate) rejects it.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load an explicit file, else `testcov.toml` if present, else defaults
    ///
    /// # Errors
    /// Returns `ConfigError` if a file was found but is unusable.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// With runner settings
    #[inline]
    #[must_use]
    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    /// With coverage settings
    #[inline]
    #[must_use]
    pub fn with_coverage(mut self, coverage: CoverageConfig) -> Self {
        self.coverage = coverage;
        self
    }

    /// With badge settings
    #[inline]
    #[must_use]
    pub fn with_badge(mut self, badge: BadgeConfig) -> Self {
        self.badge = badge;
        self
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.jobs == 0 {
            return Err(ConfigError::Invalid("runner.jobs must be at least 1".into()));
        }
        if self.runner.test_timeout_secs == Some(0) || self.runner.run_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if let Some(threshold) = self.coverage.fail_under {
            check_percent("coverage.fail_under", threshold)?;
        }
        self.badge.thresholds.validate()
    }
}

/// Test runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Number of test cases executed concurrently
    pub jobs: usize,
    /// Per-test timeout in seconds
    pub test_timeout_secs: Option<u64>,
    /// Whole-run timeout in seconds
    pub run_timeout_secs: Option<u64>,
    /// Handling of tests whose required parameter is missing
    pub missing_parameter: MissingParameterPolicy,
    /// Substring filter on test names
    pub filter: Option<String>,
}

impl RunnerConfig {
    /// With concurrency level
    #[inline]
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// With per-test timeout
    #[inline]
    #[must_use]
    pub fn with_test_timeout(mut self, secs: u64) -> Self {
        self.test_timeout_secs = Some(secs);
        self
    }

    /// With whole-run timeout
    #[inline]
    #[must_use]
    pub fn with_run_timeout(mut self, secs: u64) -> Self {
        self.run_timeout_secs = Some(secs);
        self
    }

    /// With missing-parameter policy
    #[inline]
    #[must_use]
    pub fn with_missing_parameter(mut self, policy: MissingParameterPolicy) -> Self {
        self.missing_parameter = policy;
        self
    }

    /// With name filter
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            test_timeout_secs: None,
            run_timeout_secs: None,
            missing_parameter: MissingParameterPolicy::Skip,
            filter: None,
        }
    }
}

/// Coverage tracer and reporter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    /// Coverage data file
    pub data_file: PathBuf,
    /// Merge into an existing data file instead of replacing it
    pub append: bool,
    /// Minimum total coverage percentage
    pub fail_under: Option<f64>,
    /// Where to write the machine-readable summary
    pub summary_file: Option<PathBuf>,
    /// List missing lines in the terminal table
    pub show_missing: bool,
    /// Hide fully covered files in the terminal table
    pub skip_covered: bool,
}

impl CoverageConfig {
    /// With data file path
    #[inline]
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// With append mode
    #[inline]
    #[must_use]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// With fail-under threshold
    #[inline]
    #[must_use]
    pub fn with_fail_under(mut self, percent: f64) -> Self {
        self.fail_under = Some(percent);
        self
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            append: false,
            fail_under: None,
            summary_file: None,
            show_missing: false,
            skip_covered: false,
        }
    }
}

/// Badge generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BadgeConfig {
    /// Left-hand label text
    pub label: String,
    /// Tier boundaries
    pub thresholds: Thresholds,
    /// Tier colours
    pub colors: TierColors,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            label: "coverage".to_string(),
            thresholds: Thresholds::default(),
            colors: TierColors::default(),
        }
    }
}

/// Tier boundaries in percent
///
/// `pct < medium` is low, `medium <= pct <= high` is medium, `pct > high` is high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Lowest percentage of the medium tier
    pub medium: f64,
    /// Highest percentage of the medium tier
    pub high: f64,
}

impl Thresholds {
    /// Check `0 <= medium <= high <= 100`
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the bounds are out of order or range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("badge.thresholds.medium", self.medium)?;
        check_percent("badge.thresholds.high", self.high)?;
        if self.medium > self.high {
            return Err(ConfigError::Invalid(format!(
                "badge.thresholds.medium ({}) exceeds badge.thresholds.high ({})",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            medium: 60.0,
            high: 80.0,
        }
    }
}

/// Hex colours per tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierColors {
    /// Below the medium threshold
    pub low: String,
    /// Between thresholds
    pub medium: String,
    /// Above the high threshold
    pub high: String,
}

impl Default for TierColors {
    fn default() -> Self {
        Self {
            low: "#e05d44".to_string(),
            medium: "#dfb317".to_string(),
            high: "#4c1".to_string(),
        }
    }
}

fn check_percent(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be within 0..=100, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = HarnessConfig::from_toml("", Path::new("testcov.toml")).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.coverage.data_file, PathBuf::from(DEFAULT_DATA_FILE));
        assert_eq!(config.runner.jobs, 1);
    }

    #[test]
    fn parses_all_tables() {
        let text = r##"
[runner]
jobs = 4
test_timeout_secs = 30
missing_parameter = "error"

[coverage]
data_file = "target/cov.json"
append = true
fail_under = 75.5

[badge]
label = "cov"

[badge.thresholds]
medium = 50.0
high = 90.0

[badge.colors]
high = "#00ff00"
"##;
        let config = HarnessConfig::from_toml(text, Path::new("testcov.toml")).unwrap();

        assert_eq!(config.runner.jobs, 4);
        assert_eq!(config.runner.test_timeout_secs, Some(30));
        assert_eq!(config.runner.missing_parameter, MissingParameterPolicy::Error);
        assert_eq!(config.coverage.data_file, PathBuf::from("target/cov.json"));
        assert!(config.coverage.append);
        assert_eq!(config.coverage.fail_under, Some(75.5));
        assert_eq!(config.badge.label, "cov");
        assert!((config.badge.thresholds.medium - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.badge.colors.high, "#00ff00");
        assert_eq!(config.badge.colors.low, "#e05d44");
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = HarnessConfig::from_toml("[runner]\njbos = 2\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let text = "[badge.thresholds]\nmedium = 90.0\nhigh = 10.0\n";
        let err = HarnessConfig::from_toml(text, Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_jobs() {
        let config = HarnessConfig::new().with_runner(RunnerConfig::default().with_jobs(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_fail_under() {
        let config =
            HarnessConfig::new().with_coverage(CoverageConfig::default().with_fail_under(120.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testcov.toml");
        std::fs::write(&path, "[runner]\njobs = 3\n").unwrap();

        let config = HarnessConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.runner.jobs, 3);
    }
}
