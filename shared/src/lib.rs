// shared/src/lib.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("backing store unavailable: {0}")]
    BackingStoreUnavailable(String),
    #[error("causality conflict lost on key {0}")]
    CausalityConflictLost(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time to live expressed in whole minutes, the unit the cache contract uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlMinutes(pub u64);

impl TtlMinutes {
    pub fn as_secs(&self) -> i64 {
        i64::try_from(self.0.saturating_mul(60)).unwrap_or(i64::MAX)
    }
}

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_minutes_to_seconds() {
        assert_eq!(TtlMinutes(0).as_secs(), 0);
        assert_eq!(TtlMinutes(10).as_secs(), 600);
        assert_eq!(TtlMinutes(u64::MAX).as_secs(), i64::MAX);
    }

    #[test]
    fn test_serde_json_error_maps_to_serialization() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
