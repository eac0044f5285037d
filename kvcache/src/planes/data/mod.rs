pub mod cache_store;
pub mod expiry;
pub mod operations;
pub mod resolver;
pub mod session_handler;

pub use cache_store::{CacheOptions, KvCacheStore};
pub use session_handler::{CacheSessionHandler, KvSessionHandler};
