//! testcov Runner
//!
//! Discovers and executes test cases with per-test fault containment.
//!
//! # Core Concepts
//!
//! - [`TestCase`] / [`TestBody`]: named async test logic with optional setup
//! - [`TestSuite`]: registration and deterministic discovery
//! - [`TestRunner`]: bounded-concurrency execution, results in discovery order
//! - [`RunSummary`]: counts and terminal rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use testcov_runner::{check_eq, test_case, TestRunner, TestSuite};
//!
//! let suite = TestSuite::new().with(test_case!("adds", |_ctx| async {
//!     check_eq!(1 + 1, 2);
//!     Ok(())
//! }));
//! let cases = suite.discover(None)?;
//! let results = TestRunner::default().run(cases, params, probe).await;
//! ```

#![warn(unreachable_pub)]

mod case;
mod context;
mod runner;
mod suite;
mod summary;

pub use case::{TestBody, TestCase};
pub use context::TestContext;
pub use runner::TestRunner;
pub use suite::TestSuite;
pub use summary::RunSummary;

pub use testcov_core::{Location, RunParameters, TestFault, TestResult, TestStatus};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
