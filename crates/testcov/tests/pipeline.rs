//! End-to-end tests of the harness pipeline

use pretty_assertions::assert_eq;
use std::time::Duration;
use testcov::{ExitStatus, Harness};
use testcov_core::{HarnessError, MissingParameterPolicy, RunParameters, TestStatus};
use testcov_report::{render_table, TableOptions};
use testcov_runner::TestSuite;
use testcov_test_utils::{
    config_in, erroring_case, hanging_case, panicking_case, passing_case, probed, probed_tracer,
    probing_case, setup_error_case, temp_config, ten_case_suite, token_case,
};

#[tokio::test]
async fn ten_cases_with_one_failure_and_one_error() {
    let (_dir, config) = temp_config();
    let data_file = config.coverage.data_file.clone();
    let harness = Harness::new(config, ten_case_suite());

    let run = harness
        .run_with_coverage(RunParameters::new())
        .await
        .unwrap();

    assert_eq!(run.tests.total(), 10);
    assert_eq!(run.tests.passed, 8);
    assert_eq!(run.tests.failed, 1);
    assert_eq!(run.tests.errored, 1);
    assert!(!run.tests.is_success());
    assert!(data_file.exists(), "coverage data must be written despite failures");
}

#[tokio::test]
async fn repeated_runs_yield_identical_results() {
    let (_dir, mut config) = temp_config();
    config.runner.jobs = 4;
    let harness = Harness::new(config, ten_case_suite());

    let outcomes = |summary: testcov_runner::RunSummary| {
        summary
            .results
            .into_iter()
            .map(|r| (r.name, r.status, r.detail))
            .collect::<Vec<_>>()
    };
    let first = outcomes(harness.run_tests(RunParameters::new()).await.unwrap());
    let second = outcomes(harness.run_tests(RunParameters::new()).await.unwrap());
    assert_eq!(first, second);
    assert_eq!(first[8].2.as_deref(), Some("assertion failed: expected 1, got 2"));
    assert!(first[9].2.as_deref().unwrap().starts_with("setup failed"));
}

#[tokio::test]
async fn faults_are_contained_per_test() {
    let (_dir, config) = temp_config();
    let suite = TestSuite::new()
        .with(erroring_case("errors"))
        .with(panicking_case("panics"))
        .with(setup_error_case("broken_setup"))
        .with(passing_case("still_runs"));
    let harness = Harness::new(config, suite);

    let summary = harness.run_tests(RunParameters::new()).await.unwrap();
    let statuses: Vec<_> = summary
        .results
        .iter()
        .map(|r| (r.name.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("still_runs", TestStatus::Passed),
            ("errors", TestStatus::Errored),
            ("panics", TestStatus::Failed),
            ("broken_setup", TestStatus::Errored),
        ]
    );
}

#[tokio::test]
async fn missing_token_skips_by_default() {
    let (_dir, config) = temp_config();
    let suite = TestSuite::new()
        .with(passing_case("plain"))
        .with(token_case("needs_token"));
    let harness = Harness::new(config, suite);

    let summary = harness.run_tests(RunParameters::new()).await.unwrap();
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.is_success());

    let with_token = harness
        .run_tests(RunParameters::new().with_token("abc"))
        .await
        .unwrap();
    assert_eq!(with_token.passed, 2);
}

#[tokio::test]
async fn missing_token_errors_when_configured() {
    let (_dir, mut config) = temp_config();
    config.runner.missing_parameter = MissingParameterPolicy::Error;
    let harness = Harness::new(config, TestSuite::new().with(token_case("needs_token")));

    let summary = harness.run_tests(RunParameters::new()).await.unwrap();
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.results[0].status, TestStatus::Errored);
}

#[tokio::test]
async fn unwritable_data_file_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.coverage.data_file = dir.path().join("missing").join("coverage.json");
    let harness = Harness::new(config, TestSuite::new().with(passing_case("ok")));

    let err = harness
        .run_with_coverage(RunParameters::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Persistence { .. }), "{err:?}");
    assert_eq!(ExitStatus::from(&err).code(), 2);
}

#[tokio::test]
async fn probes_are_measured_per_site() {
    let (_dir, config) = temp_config();
    let harness = Harness::new(config, TestSuite::new().with(probing_case("positive", 1)))
        .with_tracer(probed_tracer());

    let run = harness
        .run_with_coverage(RunParameters::new())
        .await
        .unwrap();

    let file = run.coverage.file(probed::SOURCE_FILE).unwrap();
    assert_eq!(file.sites, 4);
    assert_eq!(file.covered, 3);
    assert_eq!(file.partial_branches.len(), 1);
    assert_eq!(run.coverage.percent(), 75.0);
}

#[tokio::test]
async fn report_and_badge_are_deterministic() {
    let (dir, config) = temp_config();
    let harness = Harness::new(config, TestSuite::new().with(probing_case("negative", -1)))
        .with_tracer(probed_tracer());

    let first = harness
        .run_with_coverage(RunParameters::new())
        .await
        .unwrap();
    let second = harness
        .run_with_coverage(RunParameters::new())
        .await
        .unwrap();
    let options = TableOptions::default().with_show_missing(true);
    assert_eq!(
        render_table(&first.coverage, options),
        render_table(&second.coverage, options)
    );

    let one = dir.path().join("one.svg");
    let two = dir.path().join("two.svg");
    harness.generate_badge(None, &one).unwrap();
    harness.generate_badge(None, &two).unwrap();
    assert_eq!(
        std::fs::read_to_string(&one).unwrap(),
        std::fs::read_to_string(&two).unwrap()
    );
}

#[tokio::test]
async fn append_accumulates_across_runs() {
    let (_dir, mut config) = temp_config();
    config.coverage.append = true;
    let first = Harness::new(config.clone(), TestSuite::new().with(probing_case("neg", -1)))
        .with_tracer(probed_tracer());
    let second = Harness::new(config, TestSuite::new().with(probing_case("pos", 1)))
        .with_tracer(probed_tracer());

    first.run_with_coverage(RunParameters::new()).await.unwrap();
    let run = second.run_with_coverage(RunParameters::new()).await.unwrap();

    assert_eq!(run.coverage.percent(), 100.0);
    assert_eq!(run.record.hits(probed::SOURCE_FILE, testcov_core::Site::line(10)), Some(2));
}

#[tokio::test]
async fn cancellation_flushes_partial_coverage() {
    let (_dir, mut config) = temp_config();
    config.runner.jobs = 2;
    let data_file = config.coverage.data_file.clone();
    let suite = TestSuite::new()
        .with(hanging_case("hangs"))
        .with(probing_case("probes", 1));
    let harness = Harness::new(config, suite).with_tracer(probed_tracer());

    let err = harness
        .run_with_coverage_until(
            RunParameters::new(),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert!(err.is_cancellation(), "{err:?}");
    let record = testcov_tracer::load_file(&data_file).unwrap();
    assert!(record.total_hits() > 0, "partial coverage was not flushed");
}

#[tokio::test]
async fn run_timeout_cancels() {
    let (_dir, mut config) = temp_config();
    config.runner.run_timeout_secs = Some(1);
    let harness = Harness::new(config, TestSuite::new().with(hanging_case("hangs")));

    let err = harness.run_tests(RunParameters::new()).await.unwrap_err();
    assert!(
        matches!(&err, HarnessError::Cancelled { reason } if reason.contains("run timeout")),
        "{err:?}"
    );
}

#[tokio::test]
async fn report_merges_and_combine_writes() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let mut other = testcov_tracer::CoverageRecord::new();
    other.record("src/a.rs", testcov_core::Site::line(2), 1);
    testcov_tracer::write_file(&a, &testcov_test_utils::sample_record()).unwrap();
    testcov_tracer::write_file(&b, &other).unwrap();

    let harness = Harness::new(config_in(dir.path()), TestSuite::new());
    let merged = harness.report(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(merged.file("src/a.rs").unwrap().missing, "4-5");

    let out = dir.path().join("all.json");
    let combined = harness.combine(&[a, b], &out).unwrap();
    assert_eq!(
        harness.report(&[out]).unwrap(),
        testcov_report::report(std::slice::from_ref(&combined))
    );
}

#[tokio::test]
async fn report_without_data_fails() {
    let (_dir, config) = temp_config();
    let harness = Harness::new(config, TestSuite::new());
    let err = harness.report(&[]).unwrap_err();
    assert!(matches!(err, HarnessError::NoCoverageData { .. }), "{err:?}");
}
