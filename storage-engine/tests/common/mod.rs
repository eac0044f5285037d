#![allow(dead_code)]

use kvcache::{BucketProperties, CacheOptions, KvCacheStore, ManualClock, init_bucket};
use std::sync::Arc;
use storage_engine::MemoryKv;
use tracing_subscriber::EnvFilter;

pub const CACHE_BUCKET: &str = "cache.unittest.nomults";
pub const SIBLING_BUCKET: &str = "cache.unittest.mults";
pub const SESSION_BUCKET: &str = "sessions.unittest";

/// 2024-01-01T00:00:00Z
pub const START: i64 = 1_704_067_200;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct CacheFixture {
    pub kv: Arc<MemoryKv>,
    pub clock: Arc<ManualClock>,
    pub store: KvCacheStore<MemoryKv>,
}

pub async fn cache_fixture(bucket: &str, properties: BucketProperties) -> CacheFixture {
    cache_fixture_with(bucket, properties, CacheOptions::default()).await
}

pub async fn cache_fixture_with(
    bucket: &str,
    properties: BucketProperties,
    options: CacheOptions,
) -> CacheFixture {
    init_tracing();
    let kv = Arc::new(MemoryKv::new());
    init_bucket(kv.as_ref(), bucket, properties).await.unwrap();

    let clock = Arc::new(ManualClock::new(START));
    let store = KvCacheStore::new(kv.clone(), bucket)
        .with_clock(clock.clone())
        .with_options(options);

    CacheFixture { kv, clock, store }
}
