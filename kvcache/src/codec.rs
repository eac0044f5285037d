//! Content and metadata encoding for stored objects.
//!
//! Values travel as JSON content bytes. The creation and expiry timestamps
//! travel out of band as integer index slots so the store can range-query them
//! without reading content.

use crate::domain::StoredObject;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::Result;
use tracing::warn;

/// Creation timestamp index, unix seconds.
pub const TIMESTAMP_INDEX: &str = "ts_int";
/// Absolute expiry index, unix seconds. Missing means the object never expires.
pub const EXPIRES_INDEX: &str = "exp_int";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

pub fn encode_value<V>(value: &V) -> Result<Bytes>
where
    V: Serialize + ?Sized,
{
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Decode stored content. Empty or malformed content reads as a miss.
pub fn decode_value<V>(key: &str, content: &[u8]) -> Option<V>
where
    V: DeserializeOwned,
{
    if content.is_empty() {
        return None;
    }
    match serde_json::from_slice(content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding unreadable content for key '{}': {}", key, e);
            None
        }
    }
}

/// Read content as an integer counter. Anything that is not a number, or a
/// string holding one, counts as zero.
pub fn decode_integer(content: &[u8]) -> i64 {
    match serde_json::from_slice::<serde_json::Value>(content) {
        Ok(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Ok(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn encode_metadata(object: StoredObject, metadata: &Metadata) -> StoredObject {
    let object = object.with_index(TIMESTAMP_INDEX, metadata.created_at);
    match metadata.expires_at {
        Some(expires_at) => object.with_index(EXPIRES_INDEX, expires_at),
        None => object,
    }
}

pub fn decode_metadata(object: &StoredObject) -> Metadata {
    Metadata {
        created_at: object.index(TIMESTAMP_INDEX).unwrap_or(0),
        expires_at: object.index(EXPIRES_INDEX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_survives_encoding() {
        let value = "ÅÆØ Ole bole gik i skole, \"drop table forbi #€%&//&(&!";
        let content = encode_value(value).unwrap();
        let decoded: Option<String> = decode_value("k", &content);
        assert_eq!(decoded.as_deref(), Some(value));
    }

    #[test]
    fn test_empty_and_malformed_content_read_as_miss() {
        assert_eq!(decode_value::<String>("k", b""), None);
        assert_eq!(decode_value::<String>("k", b"{not json"), None);
        assert_eq!(decode_value::<u32>("k", b"\"text\""), None);
    }

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode_integer(b"42"), 42);
        assert_eq!(decode_integer(b"-7"), -7);
        assert_eq!(decode_integer(b"3.9"), 3);
        assert_eq!(decode_integer(b"\" 12 \""), 12);
        assert_eq!(decode_integer(b"\"twelve\""), 0);
        assert_eq!(decode_integer(b"[1]"), 0);
        assert_eq!(decode_integer(b""), 0);
    }

    #[test]
    fn test_metadata_lives_in_indexes() {
        let object = encode_metadata(
            StoredObject::new("1", JSON_CONTENT_TYPE),
            &Metadata {
                created_at: 100,
                expires_at: Some(700),
            },
        );
        assert_eq!(object.content, Bytes::from_static(b"1"));
        assert_eq!(object.index(TIMESTAMP_INDEX), Some(100));
        assert_eq!(object.index(EXPIRES_INDEX), Some(700));

        let forever = encode_metadata(
            StoredObject::new("1", JSON_CONTENT_TYPE),
            &Metadata {
                created_at: 100,
                expires_at: None,
            },
        );
        assert_eq!(forever.index(EXPIRES_INDEX), None);
        assert_eq!(
            decode_metadata(&forever),
            Metadata {
                created_at: 100,
                expires_at: None
            }
        );
    }
}
