use std::process::ExitCode;
use testcov::cli::{self, Cli};
use testcov::{fixture, logging, ExitStatus};
use testcov_tracer::Tracer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitStatus::HarnessError.into()
            } else {
                ExitStatus::Success.into()
            };
        }
    };

    if let Err(err) = logging::init(cli.log_format, cli.verbose) {
        eprintln!("testcov: cannot initialise logging: {err:#}");
        return ExitStatus::HarnessError.into();
    }

    let tracer = Tracer::new();
    let sites = fixture::register_sources(&tracer);
    tracing::debug!(sites, "fixture sources registered");

    cli::execute(&cli, fixture::suite(), tracer).await.into()
}
