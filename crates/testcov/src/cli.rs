//! Command-line interface

use crate::exit::ExitStatus;
use crate::logging::LogFormat;
use crate::pipeline::Harness;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use testcov_core::{HarnessConfig, HarnessError, RunParameters};
use testcov_report::{render_table, CoverageSummary, TableOptions};
use testcov_runner::TestSuite;
use testcov_tracer::Tracer;

/// Options shared by the two test-running subcommands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Authentication token forwarded to tests
    pub token: Option<String>,
    /// Test name substring filter
    pub filter: Option<String>,
    /// Concurrency override
    pub jobs: Option<usize>,
}

/// Coverage overrides of `run-tests-with-coverage`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageArgs {
    /// Data file override
    pub data_file: Option<PathBuf>,
    /// Merge into existing data
    pub append: bool,
    /// Minimum total percentage
    pub fail_under: Option<f64>,
    /// JSON summary destination
    pub summary_json: Option<PathBuf>,
    /// Show the `Missing` column
    pub show_missing: bool,
}

/// A parsed subcommand
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Run the suite
    RunTests(RunArgs),
    /// Run the suite under the coverage tracer
    RunTestsWithCoverage(RunArgs, CoverageArgs),
    /// Summarize data files
    Report {
        /// Inputs; the configured data file when empty
        data_files: Vec<PathBuf>,
        /// Show the `Missing` column
        show_missing: bool,
        /// Hide fully covered files
        skip_covered: bool,
        /// JSON summary destination
        json: Option<PathBuf>,
        /// Minimum total percentage
        fail_under: Option<f64>,
    },
    /// Merge data files
    Combine {
        /// Destination
        output: PathBuf,
        /// Inputs
        inputs: Vec<PathBuf>,
    },
    /// Render the coverage badge
    GenerateBadge {
        /// Destination
        output: PathBuf,
        /// Input; the configured data file when absent
        data_file: Option<PathBuf>,
    },
}

/// A parsed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Log line format
    pub log_format: LogFormat,
    /// `-v` count
    pub verbose: u8,
    /// What to do
    pub command: CliCommand,
}

fn run_args() -> [Arg; 3] {
    [
        Arg::new("token")
            .long("token")
            .value_name("TOKEN")
            .help("Authentication token forwarded to tests that require it"),
        Arg::new("filter")
            .short('k')
            .value_name("SUBSTRING")
            .help("Only run tests whose name contains SUBSTRING"),
        Arg::new("jobs")
            .long("jobs")
            .short('j')
            .value_name("N")
            .value_parser(value_parser!(usize))
            .help("Number of tests run concurrently"),
    ]
}

fn fail_under_arg() -> Arg {
    Arg::new("fail-under")
        .long("fail-under")
        .value_name("PCT")
        .value_parser(value_parser!(f64))
        .help("Exit with status 3 if total coverage is below PCT")
}

fn show_missing_arg() -> Arg {
    Arg::new("show-missing")
        .long("show-missing")
        .short('m')
        .action(ArgAction::SetTrue)
        .help("Show line ranges and branch arms that were never executed")
}

/// The `testcov` command tree
#[must_use]
pub fn build_command() -> Command {
    Command::new("testcov")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run tests, trace coverage, report and render a coverage badge")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file (default: ./testcov.toml if present)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["pretty", "json"])
                .default_value("pretty")
                .help("Log line format on stderr"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (repeatable)"),
        )
        .subcommand(
            Command::new("run-tests")
                .about("Run the test suite")
                .args(run_args()),
        )
        .subcommand(
            Command::new("run-tests-with-coverage")
                .about("Run the test suite and record coverage")
                .args(run_args())
                .arg(
                    Arg::new("data-file")
                        .long("data-file")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Coverage data file"),
                )
                .arg(
                    Arg::new("append")
                        .long("append")
                        .action(ArgAction::SetTrue)
                        .help("Merge into existing coverage data instead of replacing it"),
                )
                .arg(fail_under_arg())
                .arg(
                    Arg::new("summary-json")
                        .long("summary-json")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Also write the coverage summary as JSON"),
                )
                .arg(show_missing_arg()),
        )
        .subcommand(
            Command::new("report")
                .about("Summarize coverage data")
                .arg(
                    Arg::new("data-file")
                        .long("data-file")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .action(ArgAction::Append)
                        .help("Coverage data file (repeatable; inputs are merged)"),
                )
                .arg(show_missing_arg())
                .arg(
                    Arg::new("skip-covered")
                        .long("skip-covered")
                        .action(ArgAction::SetTrue)
                        .help("Hide files with complete coverage"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the summary as JSON"),
                )
                .arg(fail_under_arg()),
        )
        .subcommand(
            Command::new("combine")
                .about("Merge several coverage data files into one")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .required(true)
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("inputs")
                        .required(true)
                        .num_args(1..)
                        .value_name("INPUT")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("generate-badge")
                .about("Render the coverage badge as SVG")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .required(true)
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("data-file")
                        .long("data-file")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

impl Cli {
    /// Parse an argument list
    ///
    /// # Errors
    /// Returns the clap error for invalid usage, `--help` and `--version`.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let log_format = match matches.get_one::<String>("log-format") {
            Some(raw) => raw
                .parse()
                .map_err(|msg: String| clap::Error::raw(ErrorKind::InvalidValue, msg))?,
            None => LogFormat::default(),
        };
        let command = match matches.subcommand() {
            Some(("run-tests", args)) => CliCommand::RunTests(parse_run_args(args)),
            Some(("run-tests-with-coverage", args)) => CliCommand::RunTestsWithCoverage(
                parse_run_args(args),
                CoverageArgs {
                    data_file: args.get_one::<PathBuf>("data-file").cloned(),
                    append: args.get_flag("append"),
                    fail_under: args.get_one::<f64>("fail-under").copied(),
                    summary_json: args.get_one::<PathBuf>("summary-json").cloned(),
                    show_missing: args.get_flag("show-missing"),
                },
            ),
            Some(("report", args)) => CliCommand::Report {
                data_files: args
                    .get_many::<PathBuf>("data-file")
                    .map(|paths| paths.cloned().collect())
                    .unwrap_or_default(),
                show_missing: args.get_flag("show-missing"),
                skip_covered: args.get_flag("skip-covered"),
                json: args.get_one::<PathBuf>("json").cloned(),
                fail_under: args.get_one::<f64>("fail-under").copied(),
            },
            Some(("combine", args)) => CliCommand::Combine {
                output: required_path(args, "output")?,
                inputs: args
                    .get_many::<PathBuf>("inputs")
                    .map(|paths| paths.cloned().collect())
                    .unwrap_or_default(),
            },
            Some(("generate-badge", args)) => CliCommand::GenerateBadge {
                output: required_path(args, "output")?,
                data_file: args.get_one::<PathBuf>("data-file").cloned(),
            },
            _ => {
                return Err(clap::Error::raw(
                    ErrorKind::MissingSubcommand,
                    "a subcommand is required",
                ))
            }
        };

        Ok(Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
            log_format,
            verbose: matches.get_count("verbose"),
            command,
        })
    }

    /// Configuration file values with command-line overrides applied
    ///
    /// # Errors
    /// Returns `HarnessError::Config` if the file or the result is invalid.
    pub fn resolve_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = HarnessConfig::load_or_default(self.config.as_deref())?;
        match &self.command {
            CliCommand::RunTests(run) => apply_run_args(&mut config, run),
            CliCommand::RunTestsWithCoverage(run, coverage) => {
                apply_run_args(&mut config, run);
                if let Some(path) = &coverage.data_file {
                    config.coverage.data_file.clone_from(path);
                }
                config.coverage.append |= coverage.append;
                if coverage.fail_under.is_some() {
                    config.coverage.fail_under = coverage.fail_under;
                }
                if coverage.summary_json.is_some() {
                    config.coverage.summary_file.clone_from(&coverage.summary_json);
                }
                config.coverage.show_missing |= coverage.show_missing;
            }
            CliCommand::Report {
                show_missing,
                skip_covered,
                fail_under,
                ..
            } => {
                config.coverage.show_missing |= *show_missing;
                config.coverage.skip_covered |= *skip_covered;
                if fail_under.is_some() {
                    config.coverage.fail_under = *fail_under;
                }
            }
            CliCommand::Combine { .. } | CliCommand::GenerateBadge { .. } => {}
        }
        config.validate()?;
        Ok(config)
    }

    /// Runtime parameters forwarded to tests
    #[must_use]
    pub fn parameters(&self) -> RunParameters {
        let token = match &self.command {
            CliCommand::RunTests(run) | CliCommand::RunTestsWithCoverage(run, _) => run.token.as_deref(),
            _ => None,
        };
        match token {
            Some(token) => RunParameters::new().with_token(token),
            None => RunParameters::new(),
        }
    }
}

fn parse_run_args(args: &ArgMatches) -> RunArgs {
    RunArgs {
        token: args.get_one::<String>("token").cloned(),
        filter: args.get_one::<String>("filter").cloned(),
        jobs: args.get_one::<usize>("jobs").copied(),
    }
}

fn required_path(args: &ArgMatches, id: &str) -> Result<PathBuf, clap::Error> {
    args.get_one::<PathBuf>(id).cloned().ok_or_else(|| {
        clap::Error::raw(
            ErrorKind::MissingRequiredArgument,
            format!("--{id} is required"),
        )
    })
}

fn apply_run_args(config: &mut HarnessConfig, run: &RunArgs) {
    if let Some(jobs) = run.jobs {
        config.runner.jobs = jobs;
    }
    if run.filter.is_some() {
        config.runner.filter.clone_from(&run.filter);
    }
}

/// Execute a parsed invocation against `suite`
///
/// Reports go to stdout; diagnostics go through `tracing`.
pub async fn execute(cli: &Cli, suite: TestSuite, tracer: Tracer) -> ExitStatus {
    match dispatch(cli, suite, tracer).await {
        Ok(status) => status,
        Err(err) => {
            tracing::error!(error = %err, "testcov failed");
            eprintln!("testcov: {err}");
            ExitStatus::from(&err)
        }
    }
}

async fn dispatch(cli: &Cli, suite: TestSuite, tracer: Tracer) -> Result<ExitStatus, HarnessError> {
    let config = cli.resolve_config()?;
    let harness = Harness::new(config, suite).with_tracer(tracer);
    let coverage = &harness.config().coverage;

    match &cli.command {
        CliCommand::RunTests(_) => {
            let summary = harness.run_tests(cli.parameters()).await?;
            print!("{}", summary.render_results());
            print!("{summary}");
            Ok(test_status(summary.is_success()))
        }
        CliCommand::RunTestsWithCoverage(..) => {
            let run = harness.run_with_coverage(cli.parameters()).await?;
            print!("{}", run.tests.render_results());
            print!("{}", run.tests);
            println!();
            print_coverage(&run.coverage, table_options(&harness));
            if let Some(path) = &coverage.summary_file {
                testcov_report::write_json(&run.coverage, path)?;
            }
            if !run.tests.is_success() {
                return Ok(ExitStatus::TestsFailed);
            }
            Ok(coverage_status(&run.coverage, coverage.fail_under))
        }
        CliCommand::Report { data_files, json, .. } => {
            let summary = harness.report(data_files)?;
            print_coverage(&summary, table_options(&harness));
            if let Some(path) = json {
                testcov_report::write_json(&summary, path)?;
            }
            Ok(coverage_status(&summary, coverage.fail_under))
        }
        CliCommand::Combine { output, inputs } => {
            let record = harness.combine(inputs, output)?;
            println!(
                "Combined {} data files into {} ({} sites)",
                inputs.len(),
                output.display(),
                record.site_count()
            );
            Ok(ExitStatus::Success)
        }
        CliCommand::GenerateBadge { output, data_file } => {
            let badge = harness.generate_badge(data_file.as_deref(), output)?;
            println!(
                "Wrote {} badge ({}, {}) to {}",
                badge.label,
                badge.message,
                badge.tier,
                output.display()
            );
            Ok(ExitStatus::Success)
        }
    }
}

fn table_options(harness: &Harness) -> TableOptions {
    let coverage = &harness.config().coverage;
    TableOptions::default()
        .with_show_missing(coverage.show_missing)
        .with_skip_covered(coverage.skip_covered)
}

fn print_coverage(summary: &CoverageSummary, options: TableOptions) {
    print!("{}", render_table(summary, options));
}

fn test_status(success: bool) -> ExitStatus {
    if success {
        ExitStatus::Success
    } else {
        ExitStatus::TestsFailed
    }
}

fn coverage_status(summary: &CoverageSummary, fail_under: Option<f64>) -> ExitStatus {
    match fail_under {
        Some(threshold) if !summary.meets(threshold) => {
            tracing::warn!(
                percent = summary.percent(),
                fail_under = threshold,
                "coverage below threshold"
            );
            println!(
                "Coverage failure: total of {} is less than fail-under={threshold}",
                testcov_report::display_percent(summary.percent())
            );
            ExitStatus::CoverageBelowThreshold
        }
        _ => ExitStatus::Success,
    }
}
