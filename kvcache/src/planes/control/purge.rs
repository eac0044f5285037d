use crate::planes::data::operations::delete_with_token;
use crate::ports::KvClient;
use futures::StreamExt;
use shared::Result;
use tracing::{info, warn};

/// Outcome of a bulk delete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl PurgeReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Delete every key of `bucket`, one key at a time as the store streams them.
///
/// A key that cannot be deleted is counted and skipped. Only failing to open
/// the key stream is an error.
pub async fn purge_all<C>(client: &C, bucket: &str) -> Result<PurgeReport>
where
    C: KvClient + ?Sized,
{
    let mut keys = client.stream_keys(bucket).await?;
    let mut report = PurgeReport::default();

    while let Some(item) = keys.next().await {
        let key = match item {
            Ok(key) => key,
            Err(e) => {
                warn!("Key stream for bucket '{}' yielded an error: {}", bucket, e);
                report.failed += 1;
                continue;
            }
        };

        match delete_with_token(client, bucket, &key).await {
            Ok(()) => report.succeeded += 1,
            Err(e) => {
                warn!("Failed to purge key '{}' from bucket '{}': {}", key, bucket, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Purged bucket '{}': {} deleted, {} failed",
        bucket, report.succeeded, report.failed
    );
    Ok(report)
}
