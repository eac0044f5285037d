use crate::vclock::{Dot, VClock};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream::BoxStream;
use kvcache::domain::{BucketProperties, FetchOutput, StoredObject, VersionToken};
use kvcache::ports::KvClient;
use shared::{Error, Result};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Backing-store calls that can be made to fail on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Store,
    Delete,
    ListKeys,
    QueryIndex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Unavailable,
    ConflictLost,
}

impl Fault {
    fn into_error(self, operation: Operation, key: &str) -> Error {
        match self {
            Fault::Unavailable => {
                Error::BackingStoreUnavailable(format!("injected {:?} failure on '{}'", operation, key))
            }
            Fault::ConflictLost => Error::CausalityConflictLost(key.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ArmedFault {
    fault: Fault,
    remaining: usize,
}

#[derive(Clone, Debug)]
struct Sibling {
    dot: Dot,
    object: StoredObject,
}

#[derive(Clone, Debug, Default)]
struct KeyState {
    siblings: Vec<Sibling>,
}

impl KeyState {
    fn clock(&self) -> VClock {
        self.siblings.iter().map(|s| &s.dot).collect()
    }

    /// Drop the siblings the writer has seen. Without a token nothing is dropped.
    fn retain_unseen(&mut self, seen: Option<&VClock>) {
        if let Some(seen) = seen {
            self.siblings.retain(|s| !seen.covers(&s.dot));
        }
    }
}

type Objects = Arc<DashMap<String, KeyState>>;

/// In-memory key/value store that keeps concurrent writes as siblings.
///
/// Every write gets a dot `(actor, counter)` from a per-instance actor id and a
/// counter that never repeats. The version token returned by a fetch is the
/// clock over the dots of the current siblings; a write or delete carrying it
/// replaces exactly those siblings and leaves anything written since alone.
pub struct MemoryKv {
    actor: String,
    counter: AtomicU64,
    buckets: DashMap<String, Objects>,
    properties: DashMap<String, BucketProperties>,
    faults: DashMap<Operation, ArmedFault>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            actor: Uuid::new_v4().to_string(),
            counter: AtomicU64::new(0),
            buckets: DashMap::new(),
            properties: DashMap::new(),
            faults: DashMap::new(),
        }
    }

    /// Make the next `times` calls of `operation` fail with `fault`.
    pub fn inject_fault(&self, operation: Operation, fault: Fault, times: usize) {
        self.faults.insert(
            operation,
            ArmedFault {
                fault,
                remaining: times,
            },
        );
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Number of versions currently held for `key`.
    pub fn sibling_count(&self, bucket: &str, key: &str) -> usize {
        self.existing_objects(bucket)
            .and_then(|objects| objects.get(key).map(|state| state.siblings.len()))
            .unwrap_or(0)
    }

    pub fn key_count(&self, bucket: &str) -> usize {
        self.existing_objects(bucket)
            .map(|objects| objects.len())
            .unwrap_or(0)
    }

    pub fn bucket_properties(&self, bucket: &str) -> BucketProperties {
        self.properties
            .get(bucket)
            .map(|p| *p)
            .unwrap_or_default()
    }

    fn existing_objects(&self, bucket: &str) -> Option<Objects> {
        self.buckets.get(bucket).map(|objects| Arc::clone(&objects))
    }

    fn objects(&self, bucket: &str) -> Objects {
        if let Some(objects) = self.existing_objects(bucket) {
            return objects;
        }
        Arc::clone(&self.buckets.entry(bucket.to_string()).or_default())
    }

    fn next_dot(&self) -> Dot {
        Dot::new(
            self.actor.clone(),
            self.counter.fetch_add(1, Ordering::SeqCst) + 1,
        )
    }

    fn check_fault(&self, operation: Operation, key: &str) -> Result<()> {
        let fault = {
            let Some(mut armed) = self.faults.get_mut(&operation) else {
                return Ok(());
            };
            if armed.remaining == 0 {
                return Ok(());
            }
            armed.remaining -= 1;
            armed.fault
        };
        self.faults.remove_if(&operation, |_, armed| armed.remaining == 0);
        Err(fault.into_error(operation, key))
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKv")
            .field("actor", &self.actor)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

fn encode_token(clock: &VClock) -> Result<VersionToken> {
    Ok(VersionToken(Bytes::from(serde_json::to_vec(clock)?)))
}

fn decode_token(token: Option<&VersionToken>) -> Result<Option<VClock>> {
    token
        .map(|token| {
            serde_json::from_slice(token.as_bytes())
                .map_err(|e| Error::Internal(format!("Malformed version token: {}", e)))
        })
        .transpose()
}

#[async_trait]
impl KvClient for MemoryKv {
    async fn fetch(&self, bucket: &str, key: &str, head_only: bool) -> Result<FetchOutput> {
        self.check_fault(Operation::Fetch, key)?;

        let Some(objects) = self.existing_objects(bucket) else {
            return Ok(FetchOutput::not_found());
        };
        let (siblings, clock) = match objects.get(key) {
            Some(state) if !state.siblings.is_empty() => {
                let siblings = state
                    .siblings
                    .iter()
                    .map(|s| if head_only { s.object.head() } else { s.object.clone() })
                    .collect::<Vec<_>>();
                (siblings, state.clock())
            }
            _ => return Ok(FetchOutput::not_found()),
        };

        Ok(FetchOutput {
            siblings,
            token: Some(encode_token(&clock)?),
            found: true,
        })
    }

    async fn store(
        &self,
        bucket: &str,
        key: &str,
        object: StoredObject,
        token: Option<VersionToken>,
    ) -> Result<()> {
        self.check_fault(Operation::Store, key)?;

        let seen = decode_token(token.as_ref())?;
        let properties = self.bucket_properties(bucket);
        let dot = self.next_dot();
        let objects = self.objects(bucket);

        let mut state = objects.entry(key.to_string()).or_default();
        if properties.allow_siblings && !properties.last_write_wins {
            state.retain_unseen(seen.as_ref());
        } else {
            state.siblings.clear();
        }
        state.siblings.push(Sibling { dot, object });

        if state.siblings.len() > 1 {
            debug!(
                "Key '{}' in bucket '{}' now holds {} siblings",
                key,
                bucket,
                state.siblings.len()
            );
        }
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str, token: Option<VersionToken>) -> Result<()> {
        self.check_fault(Operation::Delete, key)?;

        let seen = decode_token(token.as_ref())?;
        let Some(objects) = self.existing_objects(bucket) else {
            return Ok(());
        };

        let emptied = match objects.get_mut(key) {
            Some(mut state) => {
                match seen {
                    Some(seen) => state.retain_unseen(Some(&seen)),
                    None => state.siblings.clear(),
                }
                state.siblings.is_empty()
            }
            None => return Ok(()),
        };

        if emptied {
            objects.remove_if(key, |_, state| state.siblings.is_empty());
        }
        Ok(())
    }

    async fn stream_keys(&self, bucket: &str) -> Result<BoxStream<'static, Result<String>>> {
        self.check_fault(Operation::ListKeys, bucket)?;

        // Snapshot the key set: handing out live shard iterators would
        // deadlock against deletes issued while the stream is consumed.
        let keys: Vec<String> = self
            .existing_objects(bucket)
            .map(|objects| objects.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default();

        Ok(futures::stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn query_index(
        &self,
        bucket: &str,
        index: &str,
        lower: i64,
        upper: i64,
    ) -> Result<Vec<String>> {
        self.check_fault(Operation::QueryIndex, bucket)?;

        let Some(objects) = self.existing_objects(bucket) else {
            return Ok(Vec::new());
        };

        let mut keys: Vec<String> = objects
            .iter()
            .filter(|entry| {
                entry.siblings.iter().any(|s| {
                    !s.object.deleted
                        && s.object
                            .index(index)
                            .is_some_and(|value| (lower..=upper).contains(&value))
                })
            })
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_bucket_properties(
        &self,
        bucket: &str,
        properties: BucketProperties,
    ) -> Result<()> {
        self.properties.insert(bucket.to_string(), properties);
        Ok(())
    }
}
