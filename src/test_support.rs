//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::report::{CommandOutput, CommandRunner, ReportError};
use crate::store::{LogPortion, LogStore, RemoteLogFile, StoreFuture};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Working directory the invocation was asked to run in.
    pub cwd: Utf8PathBuf,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_success(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        cwd: &Utf8Path,
    ) -> Result<CommandOutput, ReportError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| ReportError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Error type returned by [`ScriptedStore`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ScriptedStoreError {
    /// Scripted failure message.
    pub message: String,
}

/// Records a single portion request made through [`ScriptedStore`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PortionRequest {
    /// Instance identifier the portion was requested for.
    pub instance_id: String,
    /// Log file name the portion was requested for.
    pub log_file_name: String,
    /// Continuation marker carried by the request, absent on the first call.
    pub marker: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    listings: VecDeque<Result<Vec<RemoteLogFile>, ScriptedStoreError>>,
    portions: VecDeque<Result<LogPortion, ScriptedStoreError>>,
    listing_requests: Vec<String>,
    portion_requests: Vec<PortionRequest>,
}

/// Scripted log store that serves pre-seeded listings and portions in FIFO
/// order while recording every request it receives.
#[derive(Clone, Debug, Default)]
pub struct ScriptedStore {
    state: Arc<Mutex<StoreState>>,
}

impl ScriptedStore {
    /// Creates a new store with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful listing response.
    pub fn push_listing(&self, files: Vec<RemoteLogFile>) {
        lock(&self.state).listings.push_back(Ok(files));
    }

    /// Queues a failing listing response.
    pub fn push_listing_error(&self, message: impl Into<String>) {
        lock(&self.state).listings.push_back(Err(ScriptedStoreError {
            message: message.into(),
        }));
    }

    /// Queues a portion that reports more data pending behind `next_marker`.
    pub fn push_chunk(&self, data: impl Into<String>, next_marker: impl Into<String>) {
        lock(&self.state).portions.push_back(Ok(LogPortion {
            data: data.into(),
            marker: Some(next_marker.into()),
            additional_data_pending: true,
        }));
    }

    /// Queues the final portion of a file.
    pub fn push_final_chunk(&self, data: impl Into<String>) {
        lock(&self.state).portions.push_back(Ok(LogPortion {
            data: data.into(),
            marker: None,
            additional_data_pending: false,
        }));
    }

    /// Queues an explicit portion response.
    pub fn push_portion(&self, portion: LogPortion) {
        lock(&self.state).portions.push_back(Ok(portion));
    }

    /// Queues a failing portion response.
    pub fn push_portion_error(&self, message: impl Into<String>) {
        lock(&self.state).portions.push_back(Err(ScriptedStoreError {
            message: message.into(),
        }));
    }

    /// Returns the instance identifiers of all listing requests so far.
    #[must_use]
    pub fn listing_requests(&self) -> Vec<String> {
        lock(&self.state).listing_requests.clone()
    }

    /// Returns every portion request recorded so far, in order.
    #[must_use]
    pub fn portion_requests(&self) -> Vec<PortionRequest> {
        lock(&self.state).portion_requests.clone()
    }
}

impl LogStore for ScriptedStore {
    type Error = ScriptedStoreError;

    fn list_log_files<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> StoreFuture<'a, Vec<RemoteLogFile>, Self::Error> {
        let result = {
            let mut state = lock(&self.state);
            state.listing_requests.push(instance_id.to_owned());
            state
                .listings
                .pop_front()
                .unwrap_or_else(|| Err(no_scripted_response("listing")))
        };
        Box::pin(async move { result })
    }

    fn download_portion<'a>(
        &'a self,
        instance_id: &'a str,
        log_file_name: &'a str,
        marker: Option<&'a str>,
    ) -> StoreFuture<'a, LogPortion, Self::Error> {
        let result = {
            let mut state = lock(&self.state);
            state.portion_requests.push(PortionRequest {
                instance_id: instance_id.to_owned(),
                log_file_name: log_file_name.to_owned(),
                marker: marker.map(ToOwned::to_owned),
            });
            state
                .portions
                .pop_front()
                .unwrap_or_else(|| Err(no_scripted_response("portion")))
        };
        Box::pin(async move { result })
    }
}

fn no_scripted_response(kind: &str) -> ScriptedStoreError {
    ScriptedStoreError {
        message: format!("no scripted {kind} response available"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
