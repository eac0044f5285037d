use crate::domain::{BucketProperties, FetchOutput, StoredObject, VersionToken};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Result, TtlMinutes};

// Ports are the seams to the outside: the backing store client we consume and
// the cache/session capability sets we expose.

/// Client for an eventually consistent, sibling-capable key/value store.
#[async_trait]
pub trait KvClient: Send + Sync + 'static {
    /// Fetch every current version of `key`. With `head_only` the content bytes
    /// are left out but indexes and the version token are still returned.
    async fn fetch(&self, bucket: &str, key: &str, head_only: bool) -> Result<FetchOutput>;

    /// Write one version. `token` names the versions this write has seen.
    async fn store(
        &self,
        bucket: &str,
        key: &str,
        object: StoredObject,
        token: Option<VersionToken>,
    ) -> Result<()>;

    /// Delete the versions covered by `token`. Deleting an absent key succeeds.
    async fn delete(&self, bucket: &str, key: &str, token: Option<VersionToken>) -> Result<()>;

    /// Lazily list every key of a bucket.
    async fn stream_keys(&self, bucket: &str) -> Result<BoxStream<'static, Result<String>>>;

    /// Keys whose integer index `index` lies in `lower..=upper`.
    async fn query_index(&self, bucket: &str, index: &str, lower: i64, upper: i64)
    -> Result<Vec<String>>;

    async fn set_bucket_properties(&self, bucket: &str, properties: BucketProperties)
    -> Result<()>;
}

/// Cache capability set handed to the web framework.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned + Send;

    async fn put<V>(&self, key: &str, value: &V, ttl: Option<TtlMinutes>) -> Result<()>
    where
        V: Serialize + Sync + ?Sized;

    async fn forever<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + Sync + ?Sized;

    /// Returns the stored value after the increment.
    async fn increment(&self, key: &str, by: i64) -> Result<i64>;

    async fn decrement(&self, key: &str, by: i64) -> Result<i64>;

    async fn forget(&self, key: &str) -> Result<()>;

    async fn flush(&self) -> Result<()>;
}

/// Session capability set handed to the web framework.
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    async fn open(&self, save_path: &str, session_id: &str) -> Result<bool>;

    async fn close(&self) -> Result<bool>;

    /// Session payload, or an empty string for an unknown session.
    async fn read(&self, session_id: &str) -> Result<String>;

    async fn write(&self, session_id: &str, data: &str) -> Result<()>;

    async fn destroy(&self, session_id: &str) -> Result<()>;

    /// Remove sessions idle for more than `max_lifetime_secs`; returns how many.
    async fn gc(&self, max_lifetime_secs: i64) -> Result<usize>;
}
