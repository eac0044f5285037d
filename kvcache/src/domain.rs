use crate::codec;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Opaque causality marker handed out by the backing store on every fetch.
/// Only the store that produced it knows how to read it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionToken(pub Bytes);

impl VersionToken {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One version of an object as the backing store holds it: content bytes plus
/// the integer index slots carried next to them.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StoredObject {
    pub content: Bytes,
    pub content_type: String,
    pub indexes: BTreeMap<String, i64>,
    pub deleted: bool,
}

impl StoredObject {
    pub fn new(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            indexes: BTreeMap::new(),
            deleted: false,
        }
    }

    pub fn with_index(mut self, name: impl Into<String>, value: i64) -> Self {
        self.indexes.insert(name.into(), value);
        self
    }

    pub fn index(&self, name: &str) -> Option<i64> {
        self.indexes.get(name).copied()
    }

    /// Copy without the content bytes, which is what a head fetch returns.
    pub fn head(&self) -> Self {
        Self {
            content: Bytes::new(),
            content_type: self.content_type.clone(),
            indexes: self.indexes.clone(),
            deleted: self.deleted,
        }
    }
}

/// Raw answer of a fetch.
#[derive(Clone, Debug, Default)]
pub struct FetchOutput {
    pub siblings: Vec<StoredObject>,
    pub token: Option<VersionToken>,
    pub found: bool,
}

impl FetchOutput {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// A stored version decoded into the fields the adapter reasons about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub content: Bytes,
    pub content_type: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub deleted: bool,
    pub token: Option<VersionToken>,
}

impl Record {
    pub fn new(
        key: impl Into<String>,
        content: impl Into<Bytes>,
        content_type: impl Into<String>,
        created_at: i64,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            content_type: content_type.into(),
            created_at,
            expires_at,
            deleted: false,
            token: None,
        }
    }

    pub fn from_stored(key: &str, object: StoredObject, token: Option<VersionToken>) -> Self {
        let metadata = codec::decode_metadata(&object);
        Self {
            key: key.to_string(),
            content: object.content,
            content_type: object.content_type,
            created_at: metadata.created_at,
            expires_at: metadata.expires_at,
            deleted: object.deleted,
            token,
        }
    }

    pub fn with_token(mut self, token: Option<VersionToken>) -> Self {
        self.token = token;
        self
    }

    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    pub fn to_stored(&self) -> StoredObject {
        codec::encode_metadata(
            StoredObject::new(self.content.clone(), self.content_type.clone()),
            &codec::Metadata {
                created_at: self.created_at,
                expires_at: self.expires_at,
            },
        )
    }
}

/// Everything a fetch can say about one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadResult {
    Absent,
    Single(Record),
    Siblings(Vec<Record>),
}

impl ReadResult {
    pub fn from_fetch(key: &str, output: FetchOutput) -> Self {
        if !output.found {
            return ReadResult::Absent;
        }

        let token = output.token;
        let mut records: Vec<Record> = output
            .siblings
            .into_iter()
            .map(|object| Record::from_stored(key, object, token.clone()))
            .collect();

        match records.len() {
            0 => ReadResult::Absent,
            1 => ReadResult::Single(records.remove(0)),
            _ => ReadResult::Siblings(records),
        }
    }
}

/// Per-bucket conflict policy declared once at provisioning time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BucketProperties {
    pub allow_siblings: bool,
    pub last_write_wins: bool,
}

impl BucketProperties {
    /// Single value per key, causal conflict detection left on.
    pub fn cache_defaults() -> Self {
        Self {
            allow_siblings: false,
            last_write_wins: false,
        }
    }

    pub fn with_siblings() -> Self {
        Self {
            allow_siblings: true,
            last_write_wins: false,
        }
    }
}
