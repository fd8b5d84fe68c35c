//! Process exit statuses

use std::process::ExitCode;
use testcov_core::HarnessError;

/// Outcome of a CLI invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Everything passed
    Success,
    /// At least one test failed or errored
    TestsFailed,
    /// The harness itself failed: configuration, discovery, persistence,
    /// corrupt data, badge output or cancellation
    HarnessError,
    /// Total coverage is below `fail_under`
    CoverageBelowThreshold,
}

impl ExitStatus {
    /// Numeric process exit code
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::TestsFailed => 1,
            Self::HarnessError => 2,
            Self::CoverageBelowThreshold => 3,
        }
    }

    /// Whether the invocation succeeded
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<&HarnessError> for ExitStatus {
    fn from(_: &HarnessError) -> Self {
        Self::HarnessError
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            ExitStatus::Success,
            ExitStatus::TestsFailed,
            ExitStatus::HarnessError,
            ExitStatus::CoverageBelowThreshold,
        ]
        .map(ExitStatus::code);
        assert_eq!(codes, [0, 1, 2, 3]);
    }

    #[test]
    fn harness_errors_map_to_two() {
        let err = HarnessError::Cancelled {
            reason: "interrupted".into(),
        };
        assert_eq!(ExitStatus::from(&err).code(), 2);
    }
}
