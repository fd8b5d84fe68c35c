//! testcov
//!
//! Runs a test suite, traces which probe sites the tests execute, persists
//! the coverage data, reports it and renders a coverage badge.
//!
//! # Pipeline
//!
//! 1. [`Harness::run_tests`] / [`Harness::run_with_coverage`]: execute the
//!    suite, optionally under the coverage tracer
//! 2. [`Harness::report`]: summarize one or more persisted data files
//! 3. [`Harness::generate_badge`]: render the SVG badge for a data file
//!
//! The `testcov` binary drives these stages through [`cli`] and maps their
//! outcome to an [`ExitStatus`].

pub mod cli;
pub mod exit;
pub mod fixture;
pub mod logging;
mod pipeline;

pub use exit::ExitStatus;
pub use logging::LogFormat;
pub use pipeline::{CoverageRun, Harness};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
