//! Per-test execution context

use std::sync::Arc;
use testcov_core::{RunParameters, TestFault, TOKEN_PARAM};
use testcov_tracer::Probe;

/// What a running test can see
///
/// Cheap to clone; every clone shares the same parameters and probe.
#[derive(Debug, Clone)]
pub struct TestContext {
    name: Arc<str>,
    params: Arc<RunParameters>,
    probe: Probe,
}

impl TestContext {
    /// Create a context
    #[must_use]
    pub fn new(name: &str, params: Arc<RunParameters>, probe: Probe) -> Self {
        Self {
            name: Arc::from(name),
            params,
            probe,
        }
    }

    /// Name of the running test
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a runtime parameter
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The authentication token, if supplied
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.params.token()
    }

    /// A required parameter, or an unexpected fault naming it
    ///
    /// # Errors
    /// Returns `TestFault::Error` if the parameter is absent or empty.
    pub fn require(&self, name: &str) -> Result<&str, TestFault> {
        match self.params.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(TestFault::error(format!(
                "required parameter `{name}` was not supplied"
            ))),
        }
    }

    /// The token, or an unexpected fault
    ///
    /// # Errors
    /// Returns `TestFault::Error` if no token was supplied.
    pub fn require_token(&self) -> Result<&str, TestFault> {
        self.require(TOKEN_PARAM)
    }

    /// Coverage probe for code exercised by this test
    #[inline]
    #[must_use]
    pub fn probe(&self) -> &Probe {
        &self.probe
    }
}

/// Return an assertion fault unless `cond` holds
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        if !$cond {
            return Err($crate::TestFault::assertion(stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::TestFault::assertion(format!($($arg)+)));
        }
    };
}

/// Return an assertion fault unless both sides are equal
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left != *right {
                    return Err($crate::TestFault::assertion(format!(
                        "`{}` == `{}` (left: {:?}, right: {:?})",
                        stringify!($left),
                        stringify!($right),
                        left,
                        right
                    )));
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcov_core::TestStatus;

    fn ctx(params: RunParameters) -> TestContext {
        TestContext::new("sample", Arc::new(params), Probe::default())
    }

    #[test]
    fn require_reports_missing_parameter() {
        let err = ctx(RunParameters::new()).require_token().unwrap_err();
        assert_eq!(err.status(), TestStatus::Errored);
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn require_returns_value() {
        let context = ctx(RunParameters::new().with_token("abc"));
        assert_eq!(context.require_token().unwrap(), "abc");
        assert_eq!(context.token(), Some("abc"));
        assert_eq!(context.name(), "sample");
    }

    fn checked(value: i32) -> Result<(), TestFault> {
        crate::check!(value > 0, "value {value} not positive");
        crate::check_eq!(value % 2, 0);
        Ok(())
    }

    #[test]
    fn check_macros_return_assertion_faults() {
        assert!(checked(2).is_ok());

        let err = checked(-1).unwrap_err();
        assert_eq!(err, TestFault::assertion("value -1 not positive"));

        let err = checked(3).unwrap_err();
        assert_eq!(err.status(), TestStatus::Failed);
        assert!(err.to_string().contains("left: 1"));
    }
}
