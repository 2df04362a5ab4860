//! Pass 2: resolving scan over the canonical member
//!
//! Canonical records are `[internal_key, stable_uuid, ...]`. Each record
//! whose internal key is in the pass 1 index resolves that key's external
//! identifier. The first match for a key wins.
//!
//! Scanning stops once every index entry is resolved ([`is_complete`]).
//! Because a key is only ever resolved by its first match, nothing after
//! that point can change the result, so stopping early yields the same
//! map as reading the member to the end.

use crate::models::{InternalIndex, ResolvedMap};
use crate::tsv::Record;
use serde::{Deserialize, Serialize};
use std::io;
use tracing::debug;

/// Canonical records need at least `[internal_key, stable_uuid]`
pub const CANONICAL_MIN_FIELDS: usize = 2;

/// Pass 2 counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Decoded records seen
    pub records_read: u64,
    /// Records with fewer than [`CANONICAL_MIN_FIELDS`] fields
    pub short_records: u64,
    /// Indexed keys seen again after they were resolved
    pub duplicate_keys: u64,
    /// Every index entry was resolved; nothing after the completing
    /// record was read, whether or not the member had more
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub resolved: ResolvedMap,
    pub stats: ScanStats,
}

/// Every index entry has been resolved
pub fn is_complete(resolved: &ResolvedMap, index: &InternalIndex) -> bool {
    resolved.len() == index.len()
}

/// Run pass 2 over a canonical record stream
///
/// Completion is checked before each record is pulled, so an empty index
/// reads nothing and a complete map never reads further.
pub fn resolve<I>(records: I, index: &InternalIndex) -> io::Result<ScanOutcome>
where
    I: IntoIterator<Item = io::Result<Record>>,
{
    let mut resolved = ResolvedMap::with_capacity(index.len());
    let mut stats = ScanStats::default();
    let mut records = records.into_iter();

    loop {
        if is_complete(&resolved, index) {
            stats.completed = true;
            break;
        }

        let Some(record) = records.next() else {
            break;
        };
        let record = record?;
        stats.records_read += 1;

        let mut fields = record.fields();
        let (Some(internal_key), Some(stable_uuid)) = (fields.next(), fields.next()) else {
            stats.short_records += 1;
            continue;
        };

        let Some(external) = index.get(internal_key) else {
            continue;
        };

        if !resolved.insert(external, stable_uuid) {
            debug!(
                "Internal key {} seen again; keeping first match for {}",
                internal_key, external
            );
            stats.duplicate_keys += 1;
        }
    }

    Ok(ScanOutcome { resolved, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_builder::build_index;
    use crate::models::SoughtKeySet;

    /// Index from `(internal_key, external_identifier)` pairs
    fn index_of(pairs: &[(&str, &str)]) -> InternalIndex {
        let sought: SoughtKeySet = pairs.iter().map(|(_, ext)| *ext).collect();
        let alias = pairs
            .iter()
            .enumerate()
            .map(|(i, (key, ext))| Ok(Record::new(format!("{}\t{}\t{}", i, key, ext))));
        build_index(alias, &sought).unwrap().index
    }

    fn records(lines: &[&str]) -> Vec<io::Result<Record>> {
        lines.iter().map(|line| Ok(Record::from(*line))).collect()
    }

    /// Reference: first match per indexed key over the whole stream
    fn full_scan(lines: &[&str], index: &InternalIndex) -> ResolvedMap {
        let mut resolved = ResolvedMap::default();
        for line in lines {
            let record = Record::from(*line);
            if let (Some(key), Some(uuid)) = (record.field(0), record.field(1)) {
                if let Some(ext) = index.get(key) {
                    resolved.insert(ext, uuid);
                }
            }
        }
        resolved
    }

    #[test]
    fn test_is_complete_predicate() {
        let index = index_of(&[("500", "USA1234567"), ("501", "GBAYE0000001")]);
        let mut resolved = ResolvedMap::default();
        assert!(!is_complete(&resolved, &index));
        resolved.insert("USA1234567", "abc");
        assert!(!is_complete(&resolved, &index));
        resolved.insert("GBAYE0000001", "def");
        assert!(is_complete(&resolved, &index));

        assert!(is_complete(&ResolvedMap::default(), &InternalIndex::default()));
    }

    #[test]
    fn test_resolves_indexed_keys() {
        let index = index_of(&[("500", "USA1234567")]);
        let outcome = resolve(records(&["499\tzzz", "500\tabc-uuid-111\tname"]), &index).unwrap();

        assert_eq!(outcome.resolved.get("USA1234567"), Some("abc-uuid-111"));
        assert_eq!(outcome.resolved.len(), 1);
    }

    #[test]
    fn test_stops_once_index_resolved() {
        let index = index_of(&[("500", "USA1234567")]);
        let outcome = resolve(
            records(&["500\tabc-uuid-111", "501\tnever-read", "502\tnever-read"]),
            &index,
        )
        .unwrap();

        assert!(outcome.stats.completed);
        assert_eq!(outcome.stats.records_read, 1);
    }

    #[test]
    fn test_stops_before_unreadable_tail() {
        // An error after completion is never reached
        let index = index_of(&[("500", "USA1234567")]);
        let stream = vec![
            Ok(Record::from("500\tabc-uuid-111")),
            Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt block")),
        ];
        let outcome = resolve(stream, &index).unwrap();
        assert_eq!(outcome.resolved.len(), 1);
    }

    #[test]
    fn test_empty_index_reads_nothing() {
        let outcome = resolve(records(&["500\tabc"]), &InternalIndex::default()).unwrap();
        assert!(outcome.stats.completed);
        assert_eq!(outcome.stats.records_read, 0);
        assert!(outcome.resolved.is_empty());
    }

    #[test]
    fn test_exhausts_stream_when_key_missing() {
        let index = index_of(&[("500", "USA1234567"), ("900", "GBAYE0000001")]);
        let outcome = resolve(records(&["500\tabc", "501\tdef"]), &index).unwrap();

        assert!(!outcome.stats.completed);
        assert_eq!(outcome.stats.records_read, 2);
        assert_eq!(outcome.resolved.len(), 1);
    }

    #[test]
    fn test_duplicate_key_first_match_wins() {
        let index = index_of(&[("500", "USA1234567"), ("900", "GBAYE0000001")]);
        let outcome = resolve(
            records(&["500\tfirst-uuid", "500\tsecond-uuid", "900\tother-uuid"]),
            &index,
        )
        .unwrap();

        assert_eq!(outcome.resolved.get("USA1234567"), Some("first-uuid"));
        assert_eq!(outcome.stats.duplicate_keys, 1);
    }

    #[test]
    fn test_short_records_skipped() {
        let index = index_of(&[("500", "USA1234567")]);
        let outcome = resolve(records(&["500", "", "500\tabc"]), &index).unwrap();

        assert_eq!(outcome.stats.short_records, 2);
        assert_eq!(outcome.resolved.get("USA1234567"), Some("abc"));
    }

    #[test]
    fn test_stopping_when_complete_matches_full_scan() {
        let index = index_of(&[("3", "C"), ("1", "A"), ("7", "G")]);
        let lines = [
            "9\tx9", "7\tg-first", "2\tx2", "1\ta-first", "7\tg-second", "3\tc-first", "1\ta-second",
            "3\tc-second", "8\tx8",
        ];

        let outcome = resolve(records(&lines), &index).unwrap();
        let reference = full_scan(&lines, &index);

        assert!(outcome.stats.completed);
        assert!(outcome.stats.records_read < lines.len() as u64);
        assert_eq!(outcome.resolved, reference);
    }

    #[test]
    fn test_last_record_completing_index_counts_as_complete() {
        let index = index_of(&[("500", "USA1234567")]);
        let outcome = resolve(records(&["400	x", "500	abc"]), &index).unwrap();

        assert!(outcome.stats.completed);
        assert_eq!(outcome.stats.records_read, 2);
        assert_eq!(outcome.resolved.get("USA1234567"), Some("abc"));
    }

    #[test]
    fn test_resolved_keys_subset_of_index() {
        let index = index_of(&[("500", "USA1234567")]);
        let outcome = resolve(records(&["400\ta", "500\tb", "600\tc"]), &index).unwrap();

        let indexed: Vec<&str> = index.iter().map(|(_, ext)| ext).collect();
        for (ext, _) in outcome.resolved.iter() {
            assert!(indexed.contains(&ext));
        }
    }
}
