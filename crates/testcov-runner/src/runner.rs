//! Test execution
//!
//! Each phase of a test (setup, then run) executes in its own tokio task.
//! A panic inside a test is caught at the task boundary and recorded as
//! that test's result; the run carries on with the next case. Up to
//! `jobs` cases execute concurrently, but results are always yielded in
//! discovery order.

use crate::case::TestCase;
use crate::context::TestContext;
use futures::stream::{self, Stream, StreamExt};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use testcov_core::{
    MissingParameterPolicy, RunParameters, RunnerConfig, TestFault, TestResult, TestStatus,
};
use testcov_tracer::Probe;
use tokio::task::{AbortHandle, JoinError};

/// Executes discovered test cases
#[derive(Debug, Clone, Default)]
pub struct TestRunner {
    config: Arc<RunnerConfig>,
}

impl TestRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Runner configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute `cases`, yielding one result per case in input order
    ///
    /// Nothing runs until the stream is polled; dropping it cancels the
    /// cases still in flight.
    pub fn run_stream(
        &self,
        cases: Vec<TestCase>,
        params: Arc<RunParameters>,
        probe: Probe,
    ) -> impl Stream<Item = TestResult> + Send + 'static {
        let jobs = self.config.jobs.max(1);
        let config = Arc::clone(&self.config);
        stream::iter(cases)
            .map(move |case| execute(case, Arc::clone(&params), probe.clone(), Arc::clone(&config)))
            .buffered(jobs)
    }

    /// Execute `cases` to completion
    pub async fn run(
        &self,
        cases: Vec<TestCase>,
        params: Arc<RunParameters>,
        probe: Probe,
    ) -> Vec<TestResult> {
        self.run_stream(cases, params, probe).collect().await
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Setup,
    Run,
}

enum PhaseOutcome {
    Completed,
    Fault(TestFault),
    Panicked(String),
    TimedOut,
}

async fn execute(
    case: TestCase,
    params: Arc<RunParameters>,
    probe: Probe,
    config: Arc<RunnerConfig>,
) -> TestResult {
    let missing = case.missing_parameters(&params);
    if !missing.is_empty() {
        let names = missing.join(", ");
        return match config.missing_parameter {
            MissingParameterPolicy::Skip => {
                tracing::info!(test = case.name(), missing = %names, "skipping test");
                TestResult::skipped(
                    case.name(),
                    case.location().clone(),
                    format!("missing required parameter: {names}"),
                )
            }
            MissingParameterPolicy::Error => {
                tracing::warn!(test = case.name(), missing = %names, "required parameter missing");
                TestResult::errored(
                    case.name(),
                    case.location().clone(),
                    Duration::ZERO,
                    format!("missing required parameter: {names}"),
                )
            }
        };
    }

    tracing::debug!(test = case.name(), location = %case.location(), "running test");
    let ctx = TestContext::new(case.name(), params, probe);
    let limit = config.test_timeout_secs.map(Duration::from_secs);
    let started = Instant::now();

    let setup = run_phase(&case, ctx.clone(), Phase::Setup, limit).await;
    let result = match setup {
        PhaseOutcome::Completed => {
            let remaining = limit.map(|l| l.saturating_sub(started.elapsed()));
            let outcome = run_phase(&case, ctx, Phase::Run, remaining).await;
            classify_run(&case, outcome, started.elapsed(), limit)
        }
        other => classify_setup(&case, other, started.elapsed(), limit),
    };

    match result.status {
        TestStatus::Passed => tracing::debug!(test = %result.name, "passed"),
        status => tracing::warn!(
            test = %result.name,
            status = status.label(),
            detail = result.detail.as_deref().unwrap_or_default(),
            "test did not pass"
        ),
    }
    result
}

async fn run_phase(
    case: &TestCase,
    ctx: TestContext,
    phase: Phase,
    limit: Option<Duration>,
) -> PhaseOutcome {
    let body = case.body();
    let handle = tokio::spawn(async move {
        match phase {
            Phase::Setup => body.setup(&ctx).await,
            Phase::Run => body.run(&ctx).await,
        }
    });
    let _abort = AbortOnDrop(handle.abort_handle());

    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => return PhaseOutcome::TimedOut,
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(())) => PhaseOutcome::Completed,
        Ok(Err(fault)) => PhaseOutcome::Fault(fault),
        Err(err) => PhaseOutcome::Panicked(join_error_message(err)),
    }
}

/// Aborts the phase task when the phase is abandoned (timeout or a dropped run)
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn classify_setup(
    case: &TestCase,
    outcome: PhaseOutcome,
    elapsed: Duration,
    limit: Option<Duration>,
) -> TestResult {
    let detail = match outcome {
        PhaseOutcome::Completed => {
            return TestResult::passed(case.name(), case.location().clone(), elapsed)
        }
        PhaseOutcome::Fault(fault) => format!("setup failed: {fault}"),
        PhaseOutcome::Panicked(msg) => format!("setup panicked: {msg}"),
        PhaseOutcome::TimedOut => format!("setup timed out after {}", seconds(limit)),
    };
    TestResult::errored(case.name(), case.location().clone(), elapsed, detail)
}

fn classify_run(
    case: &TestCase,
    outcome: PhaseOutcome,
    elapsed: Duration,
    limit: Option<Duration>,
) -> TestResult {
    let name = case.name();
    let location = case.location().clone();
    match outcome {
        PhaseOutcome::Completed => TestResult::passed(name, location, elapsed),
        PhaseOutcome::Fault(fault) => match fault.status() {
            TestStatus::Failed => TestResult::failed(name, location, elapsed, fault.to_string()),
            _ => TestResult::errored(name, location, elapsed, fault.to_string()),
        },
        PhaseOutcome::Panicked(msg) => {
            TestResult::failed(name, location, elapsed, format!("panicked: {msg}"))
        }
        PhaseOutcome::TimedOut => TestResult::errored(
            name,
            location,
            elapsed,
            format!("timed out after {}", seconds(limit)),
        ),
    }
}

fn seconds(limit: Option<Duration>) -> String {
    format!("{}s", limit.unwrap_or_default().as_secs_f64())
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(&*err.into_panic())
    } else {
        "task was cancelled".to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestBody;
    use crate::check_eq;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use testcov_core::{Location, TOKEN_PARAM};
    use testcov_tracer::Tracer;

    fn at(line: u32) -> Location {
        Location::new("runner_tests.rs", line)
    }

    fn passing(name: &str, line: u32) -> TestCase {
        TestCase::from_fn(name, at(line), |_ctx| async { Ok(()) })
    }

    async fn run_one(config: RunnerConfig, case: TestCase, params: RunParameters) -> TestResult {
        let mut results = TestRunner::new(config)
            .run(vec![case], Arc::new(params), Probe::default())
            .await;
        assert_eq!(results.len(), 1);
        results.remove(0)
    }

    struct BrokenSetup;

    #[async_trait::async_trait]
    impl TestBody for BrokenSetup {
        async fn setup(&self, _ctx: &TestContext) -> Result<(), TestFault> {
            Err(TestFault::error("fixture unavailable"))
        }

        async fn run(&self, _ctx: &TestContext) -> Result<(), TestFault> {
            Err(TestFault::assertion("must not run"))
        }
    }

    struct PanickingSetup;

    #[async_trait::async_trait]
    impl TestBody for PanickingSetup {
        async fn setup(&self, _ctx: &TestContext) -> Result<(), TestFault> {
            panic!("fixture exploded");
        }

        async fn run(&self, _ctx: &TestContext) -> Result<(), TestFault> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn outcomes_are_classified() {
        let cases = vec![
            passing("ok", 1),
            TestCase::from_fn("assert", at(2), |_ctx| async {
                check_eq!(1 + 1, 3);
                Ok(())
            }),
            TestCase::from_fn("error", at(3), |_ctx| async {
                Err(TestFault::error("connection refused"))
            }),
            TestCase::from_fn("panic", at(4), |_ctx| async {
                panic!("boom");
            }),
            TestCase::new("setup", at(5), BrokenSetup),
            TestCase::new("setup_panic", at(6), PanickingSetup),
        ];

        let results = TestRunner::default()
            .run(cases, Arc::new(RunParameters::new()), Probe::default())
            .await;
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();

        assert_eq!(
            statuses,
            vec![
                TestStatus::Passed,
                TestStatus::Failed,
                TestStatus::Errored,
                TestStatus::Failed,
                TestStatus::Errored,
                TestStatus::Errored,
            ]
        );
        assert_eq!(results[3].detail.as_deref(), Some("panicked: boom"));
        assert_eq!(
            results[4].detail.as_deref(),
            Some("setup failed: fixture unavailable")
        );
        assert_eq!(
            results[5].detail.as_deref(),
            Some("setup panicked: fixture exploded")
        );
    }

    #[tokio::test]
    async fn missing_token_skips_by_default() {
        let case = passing("needs_token", 1).requires(TOKEN_PARAM);
        let result = run_one(RunnerConfig::default(), case, RunParameters::new()).await;

        assert_eq!(result.status, TestStatus::Skipped);
        assert!(result.detail.unwrap().contains(TOKEN_PARAM));
    }

    #[tokio::test]
    async fn missing_token_errors_under_error_policy() {
        let case = passing("needs_token", 1).requires(TOKEN_PARAM);
        let config = RunnerConfig::default().with_missing_parameter(MissingParameterPolicy::Error);
        let result = run_one(config, case, RunParameters::new()).await;

        assert_eq!(result.status, TestStatus::Errored);
    }

    #[tokio::test]
    async fn supplied_token_is_visible_to_the_test() {
        let case = TestCase::from_fn("uses_token", at(1), |ctx| async move {
            check_eq!(ctx.require_token()?, "secret");
            Ok(())
        })
        .requires(TOKEN_PARAM);

        let result = run_one(
            RunnerConfig::default(),
            case,
            RunParameters::new().with_token("secret"),
        )
        .await;
        assert_eq!(result.status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn hanging_test_times_out() {
        let case = TestCase::from_fn("hangs", at(1), |_ctx| async {
            std::future::pending::<()>().await;
            Ok(())
        });
        let config = RunnerConfig::default().with_test_timeout(1);
        let result = run_one(config, case, RunParameters::new()).await;

        assert_eq!(result.status, TestStatus::Errored);
        assert!(result.detail.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn concurrent_results_keep_input_order() {
        let cases: Vec<_> = (0..8u32)
            .map(|i| {
                TestCase::from_fn(format!("t{i}"), at(i), move |_ctx| async move {
                    tokio::time::sleep(Duration::from_millis(u64::from(8 - i) * 5)).await;
                    Ok(())
                })
            })
            .collect();

        let results = TestRunner::new(RunnerConfig::default().with_jobs(4))
            .run(cases, Arc::new(RunParameters::new()), Probe::default())
            .await;
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"]);
    }

    #[tokio::test]
    async fn probes_reach_the_tracer() {
        let tracer = Tracer::new();
        tracer.enable();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let case = TestCase::from_fn("probed", at(1), move |ctx| {
            let seen = Arc::clone(&seen);
            async move {
                ctx.probe().line("code.rs", 10);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        TestRunner::default()
            .run(vec![case], Arc::new(RunParameters::new()), tracer.probe())
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            tracer.snapshot().hits("code.rs", testcov_core::Site::line(10)),
            Some(1)
        );
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
