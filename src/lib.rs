//! Core library for the rdsbadger log-report tool.
//!
//! The crate exposes a store abstraction for listing and downloading managed
//! database logs, an RDS implementation over the official AWS SDK, and an
//! orchestrator that drains the current day's logs into a scratch directory
//! before handing them to pgbadger (list → filter → download → report).

pub mod fetch;
pub mod rds;
pub mod report;
pub mod scratch;
pub mod store;
pub mod test_support;

pub use fetch::{FetchError, FetchOrchestrator, RunSummary, local_midnight_millis};
pub use rds::{RdsLogStore, RdsStoreConfig, RdsStoreError};
pub use report::{
    CommandOutput, CommandRunner, DEFAULT_LOG_LINE_PREFIX, DEFAULT_PGBADGER_BIN, DEFAULT_WORK_DIR,
    ProcessCommandRunner, ReportConfig, ReportError, ReportRunner,
};
pub use scratch::{ScratchDir, ScratchError, append_chunk, remove_file_if_exists};
pub use store::{FetchRequest, LogPortion, LogStore, RemoteLogFile, RequestError, StoreFuture};
