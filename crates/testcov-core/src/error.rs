//! Error types for testcov
//!
//! Two families, handled very differently:
//! - [`TestFault`]: raised by a single test case, contained by the runner and
//!   recorded as `failed` or `errored` in that test's result
//! - [`HarnessError`]: a pipeline-stage fault (discovery, tracer persistence,
//!   reporting, badge output, configuration); it aborts the run

use crate::config::ConfigError;
use crate::types::TestStatus;
use std::path::PathBuf;

/// Fault raised from inside a test case
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestFault {
    /// Assertion mismatch
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Unexpected fault (setup failure, I/O, broken fixture)
    #[error("{0}")]
    Error(String),
}

impl TestFault {
    /// Create an assertion fault
    #[inline]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Create an unexpected fault
    #[inline]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Status this fault is recorded as when raised from the test body
    #[inline]
    #[must_use]
    pub fn status(&self) -> TestStatus {
        match self {
            Self::Assertion(_) => TestStatus::Failed,
            Self::Error(_) => TestStatus::Errored,
        }
    }
}

impl From<std::io::Error> for TestFault {
    fn from(err: std::io::Error) -> Self {
        Self::Error(format!("i/o error: {err}"))
    }
}

/// Fatal harness error
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Test discovery rejected the suite
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Coverage data could not be written
    #[error("failed to persist coverage data to {}: {source}", path.display())]
    Persistence {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Coverage data could not be read
    #[error("failed to read coverage data from {}: {source}", path.display())]
    Load {
        /// Source path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// No coverage data where it was expected
    #[error("no coverage data at {}; run `testcov run-tests-with-coverage` first", path.display())]
    NoCoverageData {
        /// Expected data file
        path: PathBuf,
    },

    /// Coverage data file failed version or checksum verification
    #[error("corrupt coverage data in {}: {reason}", path.display())]
    CorruptData {
        /// Offending file
        path: PathBuf,
        /// What did not verify
        reason: String,
    },

    /// JSON encoding or decoding failed
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A report file could not be written
    #[error("failed to write report to {}: {source}", path.display())]
    Report {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The badge image could not be written
    #[error("failed to write badge to {}: {source}", path.display())]
    Badge {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The run was cancelled (timeout or operator interrupt)
    #[error("run cancelled: {reason}")]
    Cancelled {
        /// Why the run stopped
        reason: String,
    },
}

impl HarnessError {
    /// Persistence failure helper
    #[inline]
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Corrupt data helper
    #[inline]
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if the run was cancelled rather than broken
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
