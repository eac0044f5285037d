#![deny(clippy::all)]

pub mod clock;
pub mod codec;
pub mod domain;
pub mod planes;
pub mod ports;

pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{BucketProperties, FetchOutput, ReadResult, Record, StoredObject, VersionToken};
pub use planes::control::{PurgeReport, init_bucket, purge_all};
pub use planes::data::{CacheOptions, CacheSessionHandler, KvCacheStore, KvSessionHandler};
pub use ports::{CacheStore, KvClient, SessionHandler};
