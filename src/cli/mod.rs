//! Command-line interface definitions for the `rdsbadger` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `rdsbadger` binary.
#[derive(Debug, Parser)]
#[command(
    name = "rdsbadger",
    about = "Download today's RDS instance logs and build a pgbadger report",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Download today's logs and run pgbadger over them.
    #[command(
        name = "report",
        about = "Download today's logs and run pgbadger over them"
    )]
    Report(ReportCommand),
}

/// Arguments for the `rdsbadger report` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ReportCommand {
    /// Identifier of the database instance whose logs are analysed.
    #[arg(long, value_name = "ID", env = "DB_INSTANCE_IDENTIFIER")]
    pub(crate) instance_id: String,
    /// Override the provider region for this run.
    ///
    /// When omitted, the provider SDK's default resolution chain decides
    /// which region to talk to.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Override the scratch directory receiving downloaded log files.
    ///
    /// The directory is wiped and recreated at the start of the run.
    #[arg(long, value_name = "PATH")]
    pub(crate) work_dir: Option<String>,
}
