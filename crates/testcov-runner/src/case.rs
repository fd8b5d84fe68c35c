//! Test cases
//!
//! A [`TestCase`] pairs immutable metadata (name, location, required
//! parameters) with a [`TestBody`]. Bodies are async and split into an
//! optional `setup` phase and a `run` phase, so a broken fixture can be
//! told apart from a failing assertion.

use crate::context::TestContext;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use testcov_core::{Location, RunParameters, TestFault};

/// Executable part of a test
///
/// Implement this for fixtures that need a setup phase; plain closures are
/// adapted with [`TestCase::from_fn`].
#[async_trait::async_trait]
pub trait TestBody: Send + Sync {
    /// Prepare the test; any fault here records the test as errored
    async fn setup(&self, _ctx: &TestContext) -> Result<(), TestFault> {
        Ok(())
    }

    /// Execute the test
    async fn run(&self, ctx: &TestContext) -> Result<(), TestFault>;
}

/// A discovered unit of test logic
#[derive(Clone)]
pub struct TestCase {
    name: String,
    location: Location,
    requires: Vec<String>,
    body: Arc<dyn TestBody>,
}

impl TestCase {
    /// Create a test case from a body
    #[must_use]
    pub fn new(name: impl Into<String>, location: Location, body: impl TestBody + 'static) -> Self {
        Self {
            name: name.into(),
            location,
            requires: Vec::new(),
            body: Arc::new(body),
        }
    }

    /// Create a test case from an async closure
    #[must_use]
    pub fn from_fn<F, Fut>(name: impl Into<String>, location: Location, f: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestFault>> + Send + 'static,
    {
        Self::new(name, location, FnBody(f))
    }

    /// Declare a required runtime parameter
    #[must_use]
    pub fn requires(mut self, param: impl Into<String>) -> Self {
        self.requires.push(param.into());
        self
    }

    /// Test name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration site
    #[inline]
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Declared parameter dependencies
    #[inline]
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.requires
    }

    /// Shared handle to the body
    #[inline]
    #[must_use]
    pub fn body(&self) -> Arc<dyn TestBody> {
        Arc::clone(&self.body)
    }

    /// Required parameters absent from `params`
    #[must_use]
    pub fn missing_parameters(&self, params: &RunParameters) -> Vec<&str> {
        self.requires
            .iter()
            .map(String::as_str)
            .filter(|name| !params.has(name))
            .collect()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

struct FnBody<F>(F);

#[async_trait::async_trait]
impl<F, Fut> TestBody for FnBody<F>
where
    F: Fn(TestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TestFault>> + Send,
{
    async fn run(&self, ctx: &TestContext) -> Result<(), TestFault> {
        (self.0)(ctx.clone()).await
    }
}

/// Build a [`TestCase`] from a closure, located at the invocation site
///
/// ```rust,ignore
/// let case = test_case!("adds", |_ctx| async { check_eq!(1 + 1, 2); Ok(()) });
/// ```
#[macro_export]
macro_rules! test_case {
    ($name:expr, $body:expr) => {
        $crate::TestCase::from_fn(
            $name,
            $crate::Location::new(file!(), line!()),
            $body,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcov_core::TOKEN_PARAM;

    fn noop() -> TestCase {
        TestCase::from_fn("noop", Location::new("t.rs", 1), |_ctx| async { Ok(()) })
    }

    #[test]
    fn missing_parameters_lists_absent_names() {
        let case = noop().requires(TOKEN_PARAM).requires("region");
        let params = RunParameters::new().with("region", "eu");

        assert_eq!(case.missing_parameters(&params), vec![TOKEN_PARAM]);
        assert!(case
            .missing_parameters(&params.clone().with_token("t"))
            .is_empty());
    }

    #[test]
    fn debug_omits_body() {
        let printed = format!("{:?}", noop());
        assert!(printed.contains("noop"));
        assert!(printed.contains("t.rs"));
    }

    #[test]
    fn macro_records_invocation_site() {
        let line = line!() + 1;
        let case = crate::test_case!("here", |_ctx| async { Ok(()) });
        assert_eq!(case.location(), &Location::new(file!(), line));
    }
}
