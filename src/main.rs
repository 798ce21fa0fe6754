//! Binary entry point for the rdsbadger CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use rdsbadger::{
    FetchError, FetchOrchestrator, FetchRequest, RdsLogStore, RdsStoreConfig, RdsStoreError,
    ReportConfig, ReportRunner, local_midnight_millis,
};

mod cli;

use cli::{Cli, ReportCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("report run failed: {0}")]
    Run(#[from] FetchError<RdsStoreError>),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Report(command) => report_command(command).await,
    }
}

async fn report_command(args: ReportCommand) -> Result<i32, CliError> {
    let ReportCommand {
        instance_id,
        region,
        work_dir,
    } = args;

    let mut config =
        ReportConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }

    let cutoff = local_midnight_millis()
        .ok_or_else(|| CliError::Config(String::from("could not determine local midnight")))?;
    let request = FetchRequest::new(instance_id, cutoff)
        .map_err(|err| CliError::Config(err.to_string()))?;

    let store = RdsLogStore::connect(RdsStoreConfig { region }).await;
    let report = ReportRunner::with_process_runner(config)
        .map_err(|err| CliError::Config(err.to_string()))?;
    let orchestrator = FetchOrchestrator::new(store, report);

    let summary = orchestrator.execute(&request).await?;
    if let Some(text) = summary.report {
        writeln!(io::stdout(), "{text}").ok();
    }

    Ok(0)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
