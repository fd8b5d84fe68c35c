//! The harness pipeline
//!
//! Test Runner under the Coverage Tracer, then Reporter, then Badge
//! Generator. Each stage either completes or fails the whole run with a
//! [`HarnessError`]; per-test faults never escape the runner.

use futures::{Stream, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use testcov_badge::Badge;
use testcov_core::{HarnessConfig, HarnessError, RunParameters, TestResult};
use testcov_report::CoverageSummary;
use testcov_runner::{RunSummary, TestRunner, TestSuite};
use testcov_tracer::{CoverageRecord, CoverageStore, Probe, TraceSession, Tracer};

/// Result of a traced test run
#[derive(Debug, Clone)]
pub struct CoverageRun {
    /// Test outcomes
    pub tests: RunSummary,
    /// Record as persisted (merged with prior data in append mode)
    pub record: CoverageRecord,
    /// Summary of `record`
    pub coverage: CoverageSummary,
}

/// Orchestrates a suite under a configuration
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    suite: TestSuite,
    tracer: Tracer,
}

impl Harness {
    /// Create a harness with a fresh tracer
    #[must_use]
    pub fn new(config: HarnessConfig, suite: TestSuite) -> Self {
        Self {
            config,
            suite,
            tracer: Tracer::new(),
        }
    }

    /// Use `tracer`, e.g. one with source sites already registered
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The coverage tracer
    #[inline]
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Run the suite without coverage
    ///
    /// # Errors
    /// `HarnessError::Discovery` for an invalid suite, `HarnessError::Cancelled`
    /// on run timeout or interrupt.
    pub async fn run_tests(&self, params: RunParameters) -> Result<RunSummary, HarnessError> {
        self.run_tests_until(params, ctrl_c()).await
    }

    /// [`run_tests`](Self::run_tests) with an explicit cancellation signal
    ///
    /// # Errors
    /// See [`run_tests`](Self::run_tests).
    pub async fn run_tests_until(
        &self,
        params: RunParameters,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary, HarnessError> {
        let cases = self.suite.discover(self.config.runner.filter.as_deref())?;
        tracing::info!(tests = cases.len(), jobs = self.config.runner.jobs, "running tests");

        let runner = TestRunner::new(self.config.runner.clone());
        let stream = runner.run_stream(cases, Arc::new(params), Probe::default());
        let (summary, cancelled) = self.drive(stream, shutdown).await;
        match cancelled {
            Some(reason) => Err(cancelled_error(reason, &summary)),
            None => Ok(finished(summary)),
        }
    }

    /// Run the suite with coverage tracing
    ///
    /// Coverage is persisted on every path, including cancellation, before
    /// this returns.
    ///
    /// # Errors
    /// `HarnessError::Persistence` if the data file cannot be written,
    /// `HarnessError::Cancelled` after flushing on timeout or interrupt, and
    /// the errors of [`run_tests`](Self::run_tests).
    pub async fn run_with_coverage(&self, params: RunParameters) -> Result<CoverageRun, HarnessError> {
        self.run_with_coverage_until(params, ctrl_c()).await
    }

    /// [`run_with_coverage`](Self::run_with_coverage) with an explicit
    /// cancellation signal
    ///
    /// # Errors
    /// See [`run_with_coverage`](Self::run_with_coverage).
    pub async fn run_with_coverage_until(
        &self,
        params: RunParameters,
        shutdown: impl Future<Output = ()>,
    ) -> Result<CoverageRun, HarnessError> {
        let cases = self.suite.discover(self.config.runner.filter.as_deref())?;
        let coverage = &self.config.coverage;
        let store = CoverageStore::new(&coverage.data_file).with_append(coverage.append);
        tracing::info!(tests = cases.len(), jobs = self.config.runner.jobs, "running tests with coverage");

        let session = TraceSession::start(self.tracer.clone(), store);
        let runner = TestRunner::new(self.config.runner.clone());
        let stream = runner.run_stream(cases, Arc::new(params), session.probe());
        let (summary, cancelled) = self.drive(stream, shutdown).await;
        let record = session.finish()?;

        if let Some(reason) = cancelled {
            return Err(cancelled_error(reason, &summary));
        }
        let coverage = testcov_report::report(std::slice::from_ref(&record));
        tracing::info!(percent = coverage.percent(), "coverage collected");
        Ok(CoverageRun {
            tests: finished(summary),
            record,
            coverage,
        })
    }

    /// Summarize persisted data files
    ///
    /// With no paths, the configured data file is read.
    ///
    /// # Errors
    /// `HarnessError::NoCoverageData`, `HarnessError::Load` or
    /// `HarnessError::CorruptData` for an unusable input.
    pub fn report(&self, data_files: &[PathBuf]) -> Result<CoverageSummary, HarnessError> {
        let records = self
            .data_files(data_files)
            .iter()
            .map(PathBuf::as_path)
            .map(testcov_tracer::load_file)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(testcov_report::report(&records))
    }

    /// Render the coverage badge for a data file and write it to `output`
    ///
    /// # Errors
    /// Load errors of [`report`](Self::report), or `HarnessError::Badge`.
    pub fn generate_badge(&self, data_file: Option<&Path>, output: &Path) -> Result<Badge, HarnessError> {
        let inputs: Vec<PathBuf> = data_file.map(Path::to_path_buf).into_iter().collect();
        let summary = self.report(&inputs)?;
        let badge = testcov_badge::render(&summary, &self.config.badge);
        badge.write(output)?;
        Ok(badge)
    }

    /// Merge data files into `output`
    ///
    /// # Errors
    /// Load errors of any input, or `HarnessError::Persistence`.
    pub fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<CoverageRecord, HarnessError> {
        testcov_tracer::combine(inputs, output)
    }

    fn data_files(&self, data_files: &[PathBuf]) -> Vec<PathBuf> {
        if data_files.is_empty() {
            vec![self.config.coverage.data_file.clone()]
        } else {
            data_files.to_vec()
        }
    }

    async fn drive(
        &self,
        stream: impl Stream<Item = TestResult>,
        shutdown: impl Future<Output = ()>,
    ) -> (RunSummary, Option<String>) {
        let timeout = self.config.runner.run_timeout_secs;
        let deadline = async move {
            match timeout {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };

        let mut stream = pin!(stream);
        let mut deadline = pin!(deadline);
        let mut shutdown = pin!(shutdown);
        let mut summary = RunSummary::default();

        let cancelled = loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(result) => summary.push(result),
                    None => break None,
                },
                () = &mut deadline => {
                    break Some(format!("run timeout of {}s elapsed", timeout.unwrap_or_default()));
                }
                () = &mut shutdown => break Some("interrupted".to_string()),
            }
        };
        (summary, cancelled)
    }
}

fn finished(summary: RunSummary) -> RunSummary {
    tracing::info!(
        passed = summary.passed,
        failed = summary.failed,
        errored = summary.errored,
        skipped = summary.skipped,
        "test run finished"
    );
    summary
}

fn cancelled_error(reason: String, summary: &RunSummary) -> HarnessError {
    tracing::warn!(reason = %reason, completed = summary.total(), "test run cancelled");
    HarnessError::Cancelled { reason }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
