//! Round trips shared by every adapter that talks to the backing store.

use crate::domain::{ReadResult, Record, VersionToken};
use crate::planes::data::expiry::{Expiry, check_expiry};
use crate::planes::data::resolver::{Resolution, resolve};
use crate::ports::KvClient;
use shared::Result;
use tracing::{debug, warn};

/// Head fetch that only keeps the version token.
pub async fn current_token<C>(client: &C, bucket: &str, key: &str) -> Result<Option<VersionToken>>
where
    C: KvClient + ?Sized,
{
    let output = client.fetch(bucket, key, true).await?;
    Ok(output.token)
}

/// Delete whatever versions of `key` exist right now.
pub async fn delete_with_token<C>(client: &C, bucket: &str, key: &str) -> Result<()>
where
    C: KvClient + ?Sized,
{
    let token = current_token(client, bucket, key).await?;
    client.delete(bucket, key, token).await
}

/// Full fetch of `key` resolved down to one version.
pub async fn fetch_resolved<C>(client: &C, bucket: &str, key: &str) -> Result<Option<Resolution>>
where
    C: KvClient + ?Sized,
{
    let output = client.fetch(bucket, key, false).await?;
    Ok(resolve(ReadResult::from_fetch(key, output)))
}

/// Write the winner back over its siblings. Failures are logged and dropped:
/// the siblings simply come back on a later read.
pub async fn reconcile<C>(client: &C, bucket: &str, resolution: &Resolution)
where
    C: KvClient + ?Sized,
{
    let Some(object) = resolution.pending_write.clone() else {
        return;
    };
    let key = &resolution.winner.key;

    debug!("Collapsing siblings of key '{}' in bucket '{}'", key, bucket);
    if let Err(e) = client
        .store(bucket, key, object, resolution.winner.token.clone())
        .await
    {
        warn!(
            "Failed to collapse siblings of key '{}' in bucket '{}': {}",
            key, bucket, e
        );
    }
}

/// Delete an expired version. Failures are logged and dropped; the dead
/// record is retried on the next read or by a purge.
pub async fn expire<C>(client: &C, bucket: &str, record: Record)
where
    C: KvClient + ?Sized,
{
    debug!(
        "Key '{}' in bucket '{}' expired at {:?}, deleting",
        record.key, bucket, record.expires_at
    );
    if let Err(e) = client.delete(bucket, &record.key, record.token).await {
        warn!(
            "Failed to delete expired key '{}' in bucket '{}': {}",
            record.key, bucket, e
        );
    }
}

/// Read the live version of `key` as of `now`, healing siblings and removing
/// expired data on the way.
///
/// An expired winner is deleted with the fetched token, which covers every
/// sibling, so no reconciliation write is issued for it.
pub async fn read_live<C>(client: &C, bucket: &str, key: &str, now: i64) -> Result<Option<Record>>
where
    C: KvClient + ?Sized,
{
    let Some(resolution) = fetch_resolved(client, bucket, key).await? else {
        return Ok(None);
    };

    match check_expiry(Some(resolution.winner.clone()), now) {
        Expiry::Absent => Ok(None),
        Expiry::Expired(record) => {
            expire(client, bucket, record).await;
            Ok(None)
        }
        Expiry::Live(record) => {
            reconcile(client, bucket, &resolution).await;
            Ok(Some(record))
        }
    }
}
