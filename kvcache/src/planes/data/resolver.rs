use crate::domain::{ReadResult, Record, StoredObject};

/// Outcome of resolving the versions of one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Record,
    /// Write that collapses the sibling set back to the winner, to be stored
    /// with the winner's token. `None` when the store already held one version.
    pub pending_write: Option<StoredObject>,
}

/// Pick the version of a key callers should see.
///
/// Among siblings the newest `created_at` wins. Equal timestamps fall back to
/// the greatest content bytes, then the longest lifetime (no expiry beats any
/// expiry), then the greatest content type, so the choice does not depend on
/// the order the store listed them. Tombstones never win.
pub fn resolve(read: ReadResult) -> Option<Resolution> {
    match read {
        ReadResult::Absent => None,
        ReadResult::Single(record) if record.deleted => None,
        ReadResult::Single(record) => Some(Resolution {
            winner: record,
            pending_write: None,
        }),
        ReadResult::Siblings(records) => {
            let winner = records
                .into_iter()
                .filter(|record| !record.deleted)
                .max_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.content.cmp(&b.content))
                        .then_with(|| lifetime(a).cmp(&lifetime(b)))
                        .then_with(|| a.content_type.cmp(&b.content_type))
                })?;
            let pending_write = Some(winner.to_stored());
            Some(Resolution {
                winner,
                pending_write,
            })
        }
    }
}

/// Orders expiries so that a record that never expires outranks every dated one.
fn lifetime(record: &Record) -> (bool, Option<i64>) {
    (record.expires_at.is_none(), record.expires_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, JSON_CONTENT_TYPE};
    use crate::domain::VersionToken;
    use bytes::Bytes;
    use rand::seq::SliceRandom;

    fn record(content: &str, created_at: i64) -> Record {
        Record::new("k", content.to_string(), JSON_CONTENT_TYPE, created_at, None)
            .with_token(Some(VersionToken(Bytes::from_static(b"vc"))))
    }

    #[test]
    fn test_absent_resolves_to_nothing() {
        assert_eq!(resolve(ReadResult::Absent), None);
    }

    #[test]
    fn test_single_version_needs_no_write() {
        let resolution = resolve(ReadResult::Single(record("\"a\"", 5))).unwrap();
        assert_eq!(resolution.winner.content, Bytes::from_static(b"\"a\""));
        assert_eq!(resolution.pending_write, None);
    }

    #[test]
    fn test_single_tombstone_is_absent() {
        let mut tombstone = record("", 5);
        tombstone.deleted = true;
        assert_eq!(resolve(ReadResult::Single(tombstone)), None);
    }

    #[test]
    fn test_newest_sibling_wins_and_is_written_back() {
        let siblings = vec![record("\"old\"", 10), record("\"new\"", 20), record("\"mid\"", 15)];
        let resolution = resolve(ReadResult::Siblings(siblings)).unwrap();

        assert_eq!(resolution.winner.content, Bytes::from_static(b"\"new\""));
        assert_eq!(
            resolution.winner.token,
            Some(VersionToken(Bytes::from_static(b"vc")))
        );

        let write = resolution.pending_write.unwrap();
        assert_eq!(write.content, Bytes::from_static(b"\"new\""));
        assert_eq!(write.index(codec::TIMESTAMP_INDEX), Some(20));
    }

    #[test]
    fn test_tie_break_ignores_sibling_order() {
        let mut siblings = vec![
            record("\"apple\"", 30),
            record("\"pear\"", 30),
            record("\"banana\"", 30),
            record("\"zucchini\"", 29),
        ];

        for _ in 0..20 {
            siblings.shuffle(&mut rand::rng());
            let resolution = resolve(ReadResult::Siblings(siblings.clone())).unwrap();
            assert_eq!(resolution.winner.content, Bytes::from_static(b"\"pear\""));
        }
    }

    #[test]
    fn test_equal_siblings_prefer_the_longest_lifetime() {
        let mut dated = record("\"v\"", 30);
        dated.expires_at = Some(40);
        let mut later = record("\"v\"", 30);
        later.expires_at = Some(90);
        let forever = record("\"v\"", 30);

        let orders = [
            vec![dated.clone(), later.clone(), forever.clone()],
            vec![forever.clone(), dated.clone(), later.clone()],
            vec![later.clone(), forever.clone(), dated.clone()],
        ];
        for siblings in orders {
            let resolution = resolve(ReadResult::Siblings(siblings)).unwrap();
            assert_eq!(resolution.winner.expires_at, None);
        }

        for siblings in [vec![dated.clone(), later.clone()], vec![later, dated]] {
            let resolution = resolve(ReadResult::Siblings(siblings)).unwrap();
            assert_eq!(resolution.winner.expires_at, Some(90));
        }
    }

    #[test]
    fn test_equal_siblings_break_ties_on_content_type() {
        let json = record("\"v\"", 30);
        let mut text = record("\"v\"", 30);
        text.content_type = codec::TEXT_CONTENT_TYPE.to_string();

        for siblings in [vec![json.clone(), text.clone()], vec![text, json]] {
            let resolution = resolve(ReadResult::Siblings(siblings)).unwrap();
            assert_eq!(resolution.winner.content_type, codec::TEXT_CONTENT_TYPE);
        }
    }

    #[test]
    fn test_tombstones_never_win() {
        let mut tombstone = record("", 99);
        tombstone.deleted = true;
        let resolution =
            resolve(ReadResult::Siblings(vec![tombstone.clone(), record("\"live\"", 1)])).unwrap();
        assert_eq!(resolution.winner.content, Bytes::from_static(b"\"live\""));
        assert!(resolution.pending_write.is_some());

        assert_eq!(
            resolve(ReadResult::Siblings(vec![tombstone.clone(), tombstone])),
            None
        );
    }

    #[test]
    fn test_expiry_survives_reconciliation() {
        let mut newest = record("\"v\"", 50);
        newest.expires_at = Some(110);
        let resolution = resolve(ReadResult::Siblings(vec![record("\"x\"", 1), newest])).unwrap();
        let write = resolution.pending_write.unwrap();
        assert_eq!(write.index(codec::EXPIRES_INDEX), Some(110));
    }
}
