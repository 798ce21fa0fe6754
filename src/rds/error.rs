//! Error types for the RDS log store.

use thiserror::Error;

/// Errors raised by the RDS log store.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RdsStoreError {
    /// Raised when the store configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
    /// Wrapper for provider level failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider SDK, including its error chain.
        message: String,
    },
}

impl RdsStoreError {
    /// Wraps an SDK error, preserving its full context chain in the message.
    pub(crate) fn provider(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Provider {
            message: aws_sdk_rds::error::DisplayErrorContext(err).to_string(),
        }
    }
}
