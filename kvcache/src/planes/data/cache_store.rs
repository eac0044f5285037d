use crate::clock::{Clock, SystemClock};
use crate::codec::{self, JSON_CONTENT_TYPE, TIMESTAMP_INDEX};
use crate::domain::Record;
use crate::planes::control::purge_all;
use crate::planes::data::operations;
use crate::ports::{CacheStore, KvClient};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::config::{Config, FlushStrategy, IncrementTtl};
use shared::{Result, TtlMinutes};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub flush_strategy: FlushStrategy,
    pub increment_ttl: IncrementTtl,
}

impl CacheOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flush_strategy: config.flush_strategy,
            increment_ttl: config.increment_ttl,
        }
    }
}

/// Cache store over one bucket of a sibling-capable key/value store.
///
/// Every write first fetches the current version token so it is causally
/// ordered after what the store already holds. Reads collapse siblings to the
/// newest version and delete expired entries as a side effect.
pub struct KvCacheStore<C: KvClient> {
    client: Arc<C>,
    bucket: String,
    clock: Arc<dyn Clock>,
    options: CacheOptions,
}

impl<C: KvClient> KvCacheStore<C> {
    pub fn new(client: Arc<C>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            clock: Arc::new(SystemClock),
            options: CacheOptions::default(),
        }
    }

    pub fn from_config(client: Arc<C>, config: &Config) -> Self {
        Self::new(client, config.cache_bucket.clone()).with_options(CacheOptions::from_config(config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    async fn perform_put(
        &self,
        key: &str,
        content: Bytes,
        expires_at: Option<i64>,
        now: i64,
    ) -> Result<()> {
        let token = operations::current_token(self.client.as_ref(), &self.bucket, key).await?;
        let record = Record::new(key, content, JSON_CONTENT_TYPE, now, expires_at);
        self.client
            .store(&self.bucket, key, record.to_stored(), token)
            .await
    }

    async fn mutate_numeric(&self, key: &str, by: i64) -> Result<i64> {
        let now = self.clock.now();
        let current =
            operations::read_live(self.client.as_ref(), &self.bucket, key, now).await?;

        let (previous, expires_at) = match current {
            Some(record) => {
                let expires_at = match self.options.increment_ttl {
                    IncrementTtl::Drop => None,
                    IncrementTtl::Preserve => record.expires_at,
                };
                (codec::decode_integer(&record.content), expires_at)
            }
            None => (0, None),
        };

        let value = previous.saturating_add(by);
        self.perform_put(key, codec::encode_value(&value)?, expires_at, now)
            .await?;
        Ok(value)
    }

    async fn flush_by_index(&self) -> Result<()> {
        let upper = self.clock.now().saturating_add(1);
        let keys = self
            .client
            .query_index(&self.bucket, TIMESTAMP_INDEX, 0, upper)
            .await?;

        let mut failed = 0usize;
        for key in &keys {
            if let Err(e) = self.forget(key).await {
                warn!("Failed to forget key '{}' in bucket '{}': {}", key, self.bucket, e);
                failed += 1;
            }
        }

        info!(
            "Flushed bucket '{}' by timestamp index: {} keys, {} failed",
            self.bucket,
            keys.len(),
            failed
        );
        Ok(())
    }
}

impl<C: KvClient> Debug for KvCacheStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvCacheStore")
            .field("bucket", &self.bucket)
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl<C: KvClient> CacheStore for KvCacheStore<C> {
    async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned + Send,
    {
        let now = self.clock.now();
        let record =
            operations::read_live(self.client.as_ref(), &self.bucket, key, now).await?;
        Ok(record.and_then(|record| codec::decode_value(key, &record.content)))
    }

    async fn put<V>(&self, key: &str, value: &V, ttl: Option<TtlMinutes>) -> Result<()>
    where
        V: Serialize + Sync + ?Sized,
    {
        let content = codec::encode_value(value)?;
        let now = self.clock.now();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_secs()));
        debug!(
            "Putting key '{}' in bucket '{}' expiring at {:?}",
            key, self.bucket, expires_at
        );
        self.perform_put(key, content, expires_at, now).await
    }

    async fn forever<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.put(key, value, None).await
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64> {
        self.mutate_numeric(key, by).await
    }

    async fn decrement(&self, key: &str, by: i64) -> Result<i64> {
        self.mutate_numeric(key, by.saturating_neg()).await
    }

    async fn forget(&self, key: &str) -> Result<()> {
        operations::delete_with_token(self.client.as_ref(), &self.bucket, key).await
    }

    async fn flush(&self) -> Result<()> {
        match self.options.flush_strategy {
            FlushStrategy::KeyStream => {
                let report = purge_all(self.client.as_ref(), &self.bucket).await?;
                debug!(
                    "Flushed bucket '{}' by key stream: {} keys, {} failed",
                    self.bucket,
                    report.total(),
                    report.failed
                );
                Ok(())
            }
            FlushStrategy::TimestampIndex => self.flush_by_index().await,
        }
    }
}
