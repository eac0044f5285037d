use crate::clock::{Clock, SystemClock};
use crate::codec::{TEXT_CONTENT_TYPE, TIMESTAMP_INDEX};
use crate::domain::StoredObject;
use crate::planes::data::operations;
use crate::ports::{CacheStore, KvClient, SessionHandler};
use async_trait::async_trait;
use shared::config::Config;
use shared::{Result, TtlMinutes};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session handler writing sessions straight into a bucket. Each write stamps
/// the creation timestamp index, which `gc` range-scans for idle sessions.
pub struct KvSessionHandler<C: KvClient> {
    client: Arc<C>,
    bucket: String,
    clock: Arc<dyn Clock>,
}

impl<C: KvClient> KvSessionHandler<C> {
    pub fn new(client: Arc<C>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Handler over the configured session bucket.
    pub fn from_config(client: Arc<C>, config: &Config) -> Self {
        Self::new(client, config.session_bucket.clone())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl<C: KvClient> SessionHandler for KvSessionHandler<C> {
    async fn open(&self, _save_path: &str, _session_id: &str) -> Result<bool> {
        Ok(true)
    }

    async fn close(&self) -> Result<bool> {
        Ok(true)
    }

    async fn read(&self, session_id: &str) -> Result<String> {
        let resolution =
            operations::fetch_resolved(self.client.as_ref(), &self.bucket, session_id).await?;
        let Some(resolution) = resolution else {
            return Ok(String::new());
        };

        operations::reconcile(self.client.as_ref(), &self.bucket, &resolution).await;
        Ok(String::from_utf8_lossy(&resolution.winner.content).into_owned())
    }

    async fn write(&self, session_id: &str, data: &str) -> Result<()> {
        let token =
            operations::current_token(self.client.as_ref(), &self.bucket, session_id).await?;
        let object = StoredObject::new(data.to_owned(), TEXT_CONTENT_TYPE)
            .with_index(TIMESTAMP_INDEX, self.clock.now());
        self.client
            .store(&self.bucket, session_id, object, token)
            .await
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        operations::delete_with_token(self.client.as_ref(), &self.bucket, session_id).await
    }

    async fn gc(&self, max_lifetime_secs: i64) -> Result<usize> {
        let idle_since = self.clock.now().saturating_sub(max_lifetime_secs);
        let keys = self
            .client
            .query_index(&self.bucket, TIMESTAMP_INDEX, 0, idle_since)
            .await?;

        let mut destroyed = 0;
        for key in &keys {
            match self.destroy(key).await {
                Ok(()) => destroyed += 1,
                Err(e) => warn!("Failed to destroy session '{}': {}", key, e),
            }
        }

        if destroyed > 0 {
            info!(
                "Collected {} idle session(s) from bucket '{}'",
                destroyed, self.bucket
            );
        }
        Ok(destroyed)
    }
}

/// Session handler layered over any cache store. Sessions expire through the
/// cache TTL, so `gc` has nothing to do.
pub struct CacheSessionHandler<S: CacheStore> {
    cache: Arc<S>,
    lifetime: TtlMinutes,
}

impl<S: CacheStore> CacheSessionHandler<S> {
    pub fn new(cache: Arc<S>, lifetime: TtlMinutes) -> Self {
        Self { cache, lifetime }
    }

    pub fn from_config(cache: Arc<S>, config: &Config) -> Self {
        Self::new(cache, TtlMinutes(config.session_lifetime_minutes))
    }
}

#[async_trait]
impl<S: CacheStore> SessionHandler for CacheSessionHandler<S> {
    async fn open(&self, _save_path: &str, _session_id: &str) -> Result<bool> {
        Ok(true)
    }

    async fn close(&self) -> Result<bool> {
        Ok(true)
    }

    async fn read(&self, session_id: &str) -> Result<String> {
        let data: Option<String> = self.cache.get(session_id).await?;
        Ok(data.unwrap_or_default())
    }

    async fn write(&self, session_id: &str, data: &str) -> Result<()> {
        self.cache.put(session_id, data, Some(self.lifetime)).await
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        self.cache.forget(session_id).await
    }

    async fn gc(&self, _max_lifetime_secs: i64) -> Result<usize> {
        debug!("Session gc skipped, entries expire through the cache ttl");
        Ok(0)
    }
}
