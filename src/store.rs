//! Store abstraction for listing and downloading managed database logs.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// One log file as reported by the remote listing call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteLogFile {
    /// Opaque path-like identifier assigned by the provider (for example
    /// `error/postgresql.log.2024-01-02-09`).
    pub name: String,
    /// Last-written timestamp in milliseconds since the epoch.
    pub last_written_ms: i64,
    /// File size in bytes when the provider reports one. Informational only.
    pub size_bytes: Option<i64>,
}

/// One page of a log file's content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogPortion {
    /// Content chunk, appended verbatim to the local file.
    pub data: String,
    /// Continuation token to pass to the next portion fetch.
    pub marker: Option<String>,
    /// Whether further portions remain after this one.
    pub additional_data_pending: bool,
}

/// Parameters for one report run, validated before any network call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchRequest {
    /// Identifier of the database instance whose logs are fetched.
    pub instance_id: String,
    /// Selection cutoff: only files with `last_written_ms` at or after this
    /// value are downloaded. Computed once at run start.
    pub cutoff_millis: i64,
}

impl FetchRequest {
    /// Builds a request, trimming the instance identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the instance identifier is blank or the
    /// cutoff is negative.
    pub fn new(instance_id: impl Into<String>, cutoff_millis: i64) -> Result<Self, RequestError> {
        let request = Self {
            instance_id: instance_id.into().trim().to_owned(),
            cutoff_millis,
        };
        request.validate()?;
        Ok(request)
    }

    /// Validates the request, returning a descriptive error when a field is
    /// unusable.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the instance identifier is
    /// empty and [`RequestError::NegativeCutoff`] for cutoffs before the
    /// epoch.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.instance_id.trim().is_empty() {
            return Err(RequestError::Validation("instance_id".to_owned()));
        }
        if self.cutoff_millis < 0 {
            return Err(RequestError::NegativeCutoff(self.cutoff_millis));
        }
        Ok(())
    }
}

/// Errors raised while validating a [`FetchRequest`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// Raised when the selection cutoff precedes the epoch.
    #[error("cutoff must not be negative, got {0}")]
    NegativeCutoff(i64),
}

/// Future returned by store operations.
pub type StoreFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by remote log stores.
pub trait LogStore {
    /// Provider specific error type returned by the store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every log file the instance currently exposes, in server order.
    fn list_log_files<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> StoreFuture<'a, Vec<RemoteLogFile>, Self::Error>;

    /// Fetches one portion of `log_file_name`, resuming at `marker` when one
    /// is supplied.
    fn download_portion<'a>(
        &'a self,
        instance_id: &'a str,
        log_file_name: &'a str,
        marker: Option<&'a str>,
    ) -> StoreFuture<'a, LogPortion, Self::Error>;
}
