mod common;

use common::{SIBLING_BUCKET, init_tracing};
use kvcache::codec::JSON_CONTENT_TYPE;
use kvcache::{BucketProperties, KvClient, PurgeReport, StoredObject, init_bucket, purge_all};
use shared::Error;
use storage_engine::{Fault, MemoryKv, Operation};

const BUCKET: &str = "purge.unittest";

async fn filled(count: usize) -> MemoryKv {
    init_tracing();
    let kv = MemoryKv::new();
    for i in 0..count {
        kv.store(BUCKET, &format!("key{i}"), StoredObject::new(i.to_string(), JSON_CONTENT_TYPE), None)
            .await
            .unwrap();
    }
    kv
}

#[tokio::test]
async fn test_delete_lots_of_data() {
    let kv = filled(1000).await;

    let report = purge_all(&kv, BUCKET).await.unwrap();

    assert_eq!(
        report,
        PurgeReport {
            succeeded: 1000,
            failed: 0
        }
    );
    assert_eq!(kv.key_count(BUCKET), 0);
}

#[tokio::test]
async fn test_purge_of_empty_bucket() {
    let kv = MemoryKv::new();
    let report = purge_all(&kv, "never-used").await.unwrap();
    assert_eq!(report.total(), 0);
}

#[tokio::test]
async fn test_failed_keys_do_not_abort_the_stream() {
    let kv = filled(20).await;
    kv.inject_fault(Operation::Delete, Fault::Unavailable, 2);

    let report = purge_all(&kv, BUCKET).await.unwrap();

    assert_eq!(report.succeeded, 18);
    assert_eq!(report.failed, 2);
    assert_eq!(kv.key_count(BUCKET), 2);

    let report = purge_all(&kv, BUCKET).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(kv.key_count(BUCKET), 0);
}

#[tokio::test]
async fn test_failed_token_fetch_counts_as_failure() {
    let kv = filled(5).await;
    kv.inject_fault(Operation::Fetch, Fault::Unavailable, 1);

    let report = purge_all(&kv, BUCKET).await.unwrap();

    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_unlistable_bucket_is_an_error() {
    let kv = filled(3).await;
    kv.inject_fault(Operation::ListKeys, Fault::Unavailable, 1);

    let result = purge_all(&kv, BUCKET).await;

    assert!(matches!(result, Err(Error::BackingStoreUnavailable(_))));
    assert_eq!(kv.key_count(BUCKET), 3);
}

#[tokio::test]
async fn test_purge_removes_every_sibling() {
    init_tracing();
    let kv = MemoryKv::new();
    init_bucket(&kv, SIBLING_BUCKET, BucketProperties::with_siblings())
        .await
        .unwrap();
    for content in ["a", "b", "c"] {
        kv.store(SIBLING_BUCKET, "k", StoredObject::new(content, JSON_CONTENT_TYPE), None)
            .await
            .unwrap();
    }
    assert_eq!(kv.sibling_count(SIBLING_BUCKET, "k"), 3);

    let report = purge_all(&kv, SIBLING_BUCKET).await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(kv.key_count(SIBLING_BUCKET), 0);
}

#[tokio::test]
async fn test_init_bucket_declares_properties() {
    let kv = MemoryKv::new();
    assert_eq!(kv.bucket_properties(BUCKET), BucketProperties::default());

    init_bucket(&kv, BUCKET, BucketProperties::with_siblings())
        .await
        .unwrap();

    assert_eq!(kv.bucket_properties(BUCKET), BucketProperties::with_siblings());
}
