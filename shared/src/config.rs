use tracing::{info, warn};

/// How `flush` enumerates the keys of a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlushStrategy {
    /// Stream every key of the bucket.
    #[default]
    KeyStream,
    /// Range scan of the creation timestamp index.
    TimestampIndex,
}

/// What happens to an entry's expiry when it is incremented or decremented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IncrementTtl {
    /// The rewritten entry never expires.
    #[default]
    Drop,
    /// The rewritten entry keeps the previous absolute expiry.
    Preserve,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cache_bucket: String,
    pub session_bucket: String,
    pub session_lifetime_minutes: u64,
    pub flush_strategy: FlushStrategy,
    pub increment_ttl: IncrementTtl,
}

impl Config {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 8087;
    pub const DEFAULT_CACHE_BUCKET: &'static str = "app.cache";
    pub const DEFAULT_SESSION_BUCKET: &'static str = "app.sessions";
    pub const DEFAULT_SESSION_LIFETIME_MINUTES: u64 = 120;

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment variables from {}", path.display()),
            Err(_) => info!("No .env file found, using system environment variables"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("KV_PORT")
            .and_then(|raw| {
                raw.parse::<u16>()
                    .map_err(|_| warn!("KV_PORT '{}' is not a valid port, using default", raw))
                    .ok()
            })
            .unwrap_or(Self::DEFAULT_PORT);

        let session_lifetime_minutes = lookup("KV_SESSION_LIFETIME_MINUTES")
            .and_then(|raw| {
                raw.parse::<u64>()
                    .map_err(|_| {
                        warn!("KV_SESSION_LIFETIME_MINUTES '{}' is not a number, using default", raw)
                    })
                    .ok()
            })
            .unwrap_or(Self::DEFAULT_SESSION_LIFETIME_MINUTES);

        let flush_strategy = match lookup("KV_FLUSH_STRATEGY").as_deref() {
            None | Some("keys") => FlushStrategy::KeyStream,
            Some("index") => FlushStrategy::TimestampIndex,
            Some(other) => {
                warn!("Unknown KV_FLUSH_STRATEGY '{}', streaming keys instead", other);
                FlushStrategy::KeyStream
            }
        };

        let increment_ttl = match lookup("KV_INCREMENT_TTL").as_deref() {
            None | Some("drop") => IncrementTtl::Drop,
            Some("preserve") => IncrementTtl::Preserve,
            Some(other) => {
                warn!("Unknown KV_INCREMENT_TTL '{}', dropping ttl on increment", other);
                IncrementTtl::Drop
            }
        };

        Self {
            host: lookup("KV_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port,
            cache_bucket: lookup("KV_CACHE_BUCKET")
                .unwrap_or_else(|| Self::DEFAULT_CACHE_BUCKET.to_string()),
            session_bucket: lookup("KV_SESSION_BUCKET")
                .unwrap_or_else(|| Self::DEFAULT_SESSION_BUCKET.to_string()),
            session_lifetime_minutes,
            flush_strategy,
            increment_ttl,
        }
    }

    /// `host:port` of the backing store, for whoever builds the connection.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
