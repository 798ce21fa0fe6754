//! Orchestrates end-to-end daily log report runs.
//!
//! The run workflow lists the instance's remote log files, keeps those
//! written since the cutoff, drains each selected file's paginated content
//! into the scratch directory, and finishes by invoking the report tool over
//! the downloaded files. Downloads are strictly sequential: each portion
//! request carries the marker returned by the immediately preceding
//! response, so chunks are never skipped, duplicated, or reordered.

use camino::Utf8PathBuf;
use chrono::{Local, TimeZone};
use thiserror::Error;
use tracing::{info, warn};

use crate::report::{CommandRunner, ReportRunner};
use crate::scratch::{self, ScratchDir, ScratchError};
use crate::store::{FetchRequest, LogStore, RemoteLogFile, RequestError};

#[cfg(test)]
mod tests;

/// Errors surfaced while performing a report run.
#[derive(Debug, Error)]
pub enum FetchError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    /// Raised when the request fails validation.
    #[error("invalid fetch request: {0}")]
    InvalidRequest(#[source] RequestError),
    /// Raised when the remote listing call fails.
    #[error("failed to list log files: {0}")]
    List(#[source] StoreError),
    /// Raised when a portion fetch fails mid-download.
    #[error("failed to download {file}: {source}")]
    Download {
        /// Remote log file whose download was aborted.
        file: String,
        /// Provider-specific error.
        #[source]
        source: StoreError,
    },
    /// Raised when a portion reports more data pending without a marker to
    /// resume from.
    #[error("log file {file} reported more data but returned no continuation marker")]
    MissingContinuation {
        /// Remote log file whose pagination broke down.
        file: String,
    },
    /// Raised when a scratch directory operation fails.
    #[error("scratch directory operation failed: {0}")]
    Scratch(#[source] ScratchError),
}

/// Outcome of one report run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunSummary {
    /// Local paths of every fully downloaded log file, in download order.
    pub downloaded: Vec<Utf8PathBuf>,
    /// Captured report text; `None` when report generation failed or there
    /// was nothing to analyse.
    pub report: Option<String>,
}

/// Executes the report run flow using the provided store and report runner.
#[derive(Debug)]
pub struct FetchOrchestrator<S, R: CommandRunner> {
    store: S,
    report: ReportRunner<R>,
}

impl<S, R> FetchOrchestrator<S, R>
where
    S: LogStore,
    R: CommandRunner,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(store: S, report: ReportRunner<R>) -> Self {
        Self { store, report }
    }

    /// Lists the instance's log files and keeps those written at or after
    /// the request's cutoff, preserving server order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] for an unusable request and
    /// [`FetchError::List`] when the listing call fails; both are fatal for
    /// the run.
    pub async fn list_todays_logs(
        &self,
        request: &FetchRequest,
    ) -> Result<Vec<RemoteLogFile>, FetchError<S::Error>> {
        request.validate().map_err(FetchError::InvalidRequest)?;
        let all = self
            .store
            .list_log_files(&request.instance_id)
            .await
            .map_err(FetchError::List)?;
        let total = all.len();
        let selected: Vec<RemoteLogFile> = all
            .into_iter()
            .filter(|file| file.last_written_ms >= request.cutoff_millis)
            .collect();
        info!(
            instance_id = %request.instance_id,
            total,
            selected = selected.len(),
            cutoff_millis = request.cutoff_millis,
            "selected log files written since cutoff"
        );
        Ok(selected)
    }

    /// Downloads one remote log file into the scratch directory, draining
    /// its paginated content in order, and returns the local path.
    ///
    /// Any pre-existing file at the target path is removed first; a missing
    /// file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Scratch`] for local filesystem failures,
    /// [`FetchError::Download`] when a portion fetch fails, and
    /// [`FetchError::MissingContinuation`] when the provider promises more
    /// data without a marker to resume from.
    pub async fn download_log_file(
        &self,
        instance_id: &str,
        log_file_name: &str,
        scratch: &ScratchDir,
    ) -> Result<Utf8PathBuf, FetchError<S::Error>> {
        let path = scratch
            .local_path(log_file_name)
            .map_err(FetchError::Scratch)?;
        scratch::remove_file_if_exists(&path).map_err(FetchError::Scratch)?;

        let mut marker: Option<String> = None;
        loop {
            let portion = self
                .store
                .download_portion(instance_id, log_file_name, marker.as_deref())
                .await
                .map_err(|source| FetchError::Download {
                    file: log_file_name.to_owned(),
                    source,
                })?;
            scratch::append_chunk(&path, &portion.data).map_err(FetchError::Scratch)?;
            info!(bytes = portion.data.len(), path = %path, "wrote log file portion");

            if !portion.additional_data_pending {
                break;
            }
            match portion.marker {
                Some(token) => marker = Some(token),
                None => {
                    return Err(FetchError::MissingContinuation {
                        file: log_file_name.to_owned(),
                    });
                }
            }
        }
        Ok(path)
    }

    /// Runs the end-to-end workflow and returns the run summary.
    ///
    /// The scratch directory is wiped and recreated before the first
    /// download. Report generation is a best-effort final step: a failing
    /// report tool is logged and leaves the run successful, with `report`
    /// absent from the summary.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when validation, listing, a download, or a
    /// scratch directory operation fails.
    pub async fn execute(
        &self,
        request: &FetchRequest,
    ) -> Result<RunSummary, FetchError<S::Error>> {
        let logs = self.list_todays_logs(request).await?;
        let scratch = ScratchDir::prepare(self.report.config().work_dir.clone())
            .map_err(FetchError::Scratch)?;

        let mut downloaded = Vec::with_capacity(logs.len());
        for log in &logs {
            info!(
                file = %log.name,
                last_written_ms = log.last_written_ms,
                size_bytes = log.size_bytes,
                "downloading log file"
            );
            downloaded.push(
                self.download_log_file(&request.instance_id, &log.name, &scratch)
                    .await?,
            );
        }

        let report = match self.report.generate(scratch.root()) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, "report generation failed");
                None
            }
        };

        Ok(RunSummary { downloaded, report })
    }
}

/// Returns local midnight of the current day in milliseconds since the
/// epoch, or `None` when the local calendar cannot represent it.
///
/// A DST-ambiguous midnight resolves to the earliest valid instant.
#[must_use]
pub fn local_midnight_millis() -> Option<i64> {
    let midnight = Local::now().date_naive().and_hms_opt(0, 0, 0)?;
    let instant = Local.from_local_datetime(&midnight).earliest()?;
    Some(instant.timestamp_millis())
}
