use crate::domain::Record;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expiry {
    Absent,
    Live(Record),
    /// Past its expiry; the caller should delete this exact version.
    Expired(Record),
}

pub fn check_expiry(record: Option<Record>, now: i64) -> Expiry {
    match record {
        None => Expiry::Absent,
        Some(record) if record.deleted => Expiry::Absent,
        Some(record) if record.is_expired(now) => Expiry::Expired(record),
        Some(record) => Expiry::Live(record),
    }
}
