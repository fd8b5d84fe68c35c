//! Test suites and discovery

use crate::case::TestCase;
use std::collections::HashMap;
use testcov_core::{HarnessError, Location};

/// Registered test cases, in registration order
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    /// Create an empty suite
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a case (builder form)
    #[must_use]
    pub fn with(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }

    /// Add a case
    pub fn add(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// Number of registered cases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no case is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases to run, in execution order
    ///
    /// Order is by declaration site then name, independent of registration
    /// order. `filter` keeps only names containing the substring.
    ///
    /// # Errors
    /// Returns `HarnessError::Discovery` if two cases share a name.
    pub fn discover(&self, filter: Option<&str>) -> Result<Vec<TestCase>, HarnessError> {
        let mut cases = self.cases.clone();
        cases.sort_by(|a, b| {
            a.location()
                .cmp(b.location())
                .then_with(|| a.name().cmp(b.name()))
        });

        let mut seen: HashMap<&str, &Location> = HashMap::with_capacity(cases.len());
        for case in &cases {
            if let Some(first) = seen.insert(case.name(), case.location()) {
                return Err(HarnessError::Discovery(format!(
                    "duplicate test name `{}` at {first} and {}",
                    case.name(),
                    case.location()
                )));
            }
        }

        let total = cases.len();
        if let Some(pattern) = filter {
            cases.retain(|case| case.name().contains(pattern));
        }
        tracing::info!(total, selected = cases.len(), filter = ?filter, "discovered tests");
        Ok(cases)
    }
}

impl FromIterator<TestCase> for TestSuite {
    fn from_iter<I: IntoIterator<Item = TestCase>>(iter: I) -> Self {
        Self {
            cases: iter.into_iter().collect(),
        }
    }
}

impl Extend<TestCase> for TestSuite {
    fn extend<I: IntoIterator<Item = TestCase>>(&mut self, iter: I) {
        self.cases.extend(iter);
    }
}
