//! Testing utilities for the testcov workspace
//!
//! Canned test cases for every outcome, a sample suite and record, and
//! configuration pointing into a temporary directory.

#![allow(missing_docs)]

pub mod probed;

use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use testcov_core::{HarnessConfig, Location, Site, TestFault, TOKEN_PARAM};
use testcov_runner::{TestBody, TestCase, TestContext, TestSuite};
use testcov_tracer::{CoverageRecord, Tracer};

const FILE: &str = "tests/sample.rs";

fn at(line: u32) -> Location {
    Location::new(FILE, line)
}

pub fn passing_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(1), |_ctx| async { Ok(()) })
}

pub fn failing_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(2), |_ctx| async {
        Err(TestFault::assertion("expected 1, got 2"))
    })
}

pub fn erroring_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(3), |_ctx| async {
        Err(TestFault::error("connection refused"))
    })
}

pub fn panicking_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(4), |_ctx| async {
        if true {
            panic!("boom");
        }
        Ok(())
    })
}

pub fn hanging_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(5), |_ctx| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })
}

pub fn token_case(name: &str) -> TestCase {
    TestCase::from_fn(name, at(6), |ctx| async move {
        ctx.require_token()?;
        Ok(())
    })
    .requires(TOKEN_PARAM)
}

/// Exercises [`probed::sign`] through the context's probe
pub fn probing_case(name: &str, n: i64) -> TestCase {
    TestCase::from_fn(name, at(7), move |ctx| async move {
        probed::sign(n, ctx.probe());
        Ok(())
    })
}

struct BrokenSetup;

#[async_trait::async_trait]
impl TestBody for BrokenSetup {
    async fn setup(&self, _ctx: &TestContext) -> Result<(), TestFault> {
        Err(TestFault::error("fixture unavailable"))
    }

    async fn run(&self, _ctx: &TestContext) -> Result<(), TestFault> {
        Ok(())
    }
}

pub fn setup_error_case(name: &str) -> TestCase {
    TestCase::new(name, at(8), BrokenSetup)
}

/// Eight passing tests, one failing assertion, one broken setup
pub fn ten_case_suite() -> TestSuite {
    let mut suite: TestSuite = (1..=8)
        .map(|i| passing_case(&format!("passes_{i}")))
        .collect();
    suite.add(failing_case("fails"));
    suite.add(setup_error_case("errors"));
    suite
}

/// Tracer with [`probed`]'s sites registered
pub fn probed_tracer() -> Tracer {
    let tracer = Tracer::new();
    tracer.register_source(probed::SOURCE_FILE, probed::SOURCE);
    tracer
}

/// Two files: `src/a.rs` with lines 1-5 (2 and 4-5 missed) and a fully
/// covered `src/b.rs`
pub fn sample_record() -> CoverageRecord {
    let mut record = CoverageRecord::new();
    for (line, hits) in [(1, 3), (2, 0), (3, 1), (4, 0), (5, 0)] {
        record.record("src/a.rs", Site::line(line), hits);
    }
    record.record("src/b.rs", Site::line(1), 2);
    record.record("src/b.rs", Site::branch(1, 0), 1);
    record
}

/// Default configuration with the data file inside `dir`
pub fn config_in(dir: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.coverage.data_file = dir.join("coverage.json");
    config
}

/// A temporary directory and a configuration writing into it
pub fn temp_config() -> (TempDir, HarnessConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    (dir, config)
}
