use crate::domain::BucketProperties;
use crate::ports::KvClient;
use shared::Result;
use tracing::info;

/// Declare the conflict policy of a bucket. Run once before the adapters use it.
pub async fn init_bucket<C>(client: &C, bucket: &str, properties: BucketProperties) -> Result<()>
where
    C: KvClient + ?Sized,
{
    client.set_bucket_properties(bucket, properties).await?;
    info!(
        "Bucket '{}' properties set: allow_siblings={}, last_write_wins={}",
        bucket, properties.allow_siblings, properties.last_write_wins
    );
    Ok(())
}
