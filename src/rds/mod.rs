//! RDS implementation of the log store.
//!
//! Wraps the official AWS SDK client. Credentials and the base region come
//! from the SDK's default resolution chain; only an explicit region override
//! is handled here. The describe-log-files listing is itself paginated, so
//! [`RdsLogStore::list_log_files`] drains that marker loop internally and
//! presents callers with one complete listing.

mod error;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_rds::Client;
use tracing::debug;

use crate::store::{LogPortion, LogStore, RemoteLogFile, StoreFuture};

pub use error::RdsStoreError;

/// Connection settings for the RDS log store.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RdsStoreConfig {
    /// Region override; when absent the SDK's default chain decides.
    pub region: Option<String>,
}

/// Log store backed by the RDS control-plane API.
#[derive(Clone, Debug)]
pub struct RdsLogStore {
    client: Client,
}

impl RdsLogStore {
    /// Builds a store from the ambient AWS configuration, applying the
    /// optional region override.
    pub async fn connect(config: RdsStoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
        }
    }

    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl LogStore for RdsLogStore {
    type Error = RdsStoreError;

    fn list_log_files<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> StoreFuture<'a, Vec<RemoteLogFile>, Self::Error> {
        Box::pin(async move {
            let mut files = Vec::new();
            let mut marker: Option<String> = None;
            loop {
                let mut call = self
                    .client
                    .describe_db_log_files()
                    .db_instance_identifier(instance_id);
                if let Some(token) = marker.take() {
                    call = call.marker(token);
                }
                let output = call.send().await.map_err(RdsStoreError::provider)?;

                for detail in output.describe_db_log_files.unwrap_or_default() {
                    let Some(name) = detail.log_file_name else {
                        debug!(instance_id, "skipping log file entry without a name");
                        continue;
                    };
                    files.push(RemoteLogFile {
                        name,
                        last_written_ms: detail.last_written.unwrap_or_default(),
                        size_bytes: detail.size,
                    });
                }

                match output.marker {
                    Some(token) => marker = Some(token),
                    None => break,
                }
            }
            debug!(instance_id, count = files.len(), "listed remote log files");
            Ok(files)
        })
    }

    fn download_portion<'a>(
        &'a self,
        instance_id: &'a str,
        log_file_name: &'a str,
        marker: Option<&'a str>,
    ) -> StoreFuture<'a, LogPortion, Self::Error> {
        Box::pin(async move {
            let output = self
                .client
                .download_db_log_file_portion()
                .db_instance_identifier(instance_id)
                .log_file_name(log_file_name)
                .set_marker(marker.map(ToOwned::to_owned))
                .send()
                .await
                .map_err(RdsStoreError::provider)?;

            Ok(LogPortion {
                data: output.log_file_data.unwrap_or_default(),
                marker: output.marker,
                additional_data_pending: output.additional_data_pending.unwrap_or_default(),
            })
        })
    }
}
