//! Pass 1: selective index over the alias member
//!
//! Alias records are `[row_id, internal_key, external_identifier, ...]`.
//! Only records whose external identifier is sought are kept, so the
//! index is bounded by the sought set, not by the dump. The whole member
//! is always read: a match can appear anywhere.
//!
//! The index stays one-to-one. A later record for an internal key or an
//! external identifier that is already indexed replaces the earlier entry
//! (last write wins).

use crate::models::{InternalIndex, SoughtKeySet};
use crate::tsv::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use tracing::{debug, warn};

/// Alias records need at least `[row_id, internal_key, external_identifier]`
pub const ALIAS_MIN_FIELDS: usize = 3;

/// Pass 1 counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Decoded records seen
    pub records_read: u64,
    /// Records with fewer than [`ALIAS_MIN_FIELDS`] fields
    pub short_records: u64,
    /// Records whose identifier was sought
    pub matched_records: u64,
    /// Entries dropped because a later record replaced them
    pub superseded_entries: u64,
    /// Sought identifiers with no alias entry at all
    pub unmatched_keys: usize,
}

/// Frozen index plus the counters that produced it
#[derive(Debug, Clone)]
pub struct IndexBuildOutcome {
    pub index: InternalIndex,
    pub stats: IndexStats,
}

/// Incremental pass 1 state; consumed by [`IndexBuilder::finish`]
pub struct IndexBuilder<'a> {
    sought: &'a SoughtKeySet,
    by_internal: HashMap<String, String>,
    by_external: HashMap<String, String>,
    stats: IndexStats,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(sought: &'a SoughtKeySet) -> Self {
        Self {
            sought,
            by_internal: HashMap::new(),
            by_external: HashMap::new(),
            stats: IndexStats::default(),
        }
    }

    /// Feed one alias record
    pub fn observe(&mut self, record: &Record) {
        self.stats.records_read += 1;

        let mut fields = record.fields();
        let (Some(_row_id), Some(internal_key), Some(external)) =
            (fields.next(), fields.next(), fields.next())
        else {
            self.stats.short_records += 1;
            return;
        };

        if !self.sought.contains(external) {
            return;
        }
        self.stats.matched_records += 1;

        if let Some(previous) = self
            .by_internal
            .insert(internal_key.to_string(), external.to_string())
        {
            if previous != external {
                debug!(
                    "Internal key {} re-indexed: {} replaced by {}",
                    internal_key, previous, external
                );
                self.by_external.remove(&previous);
                self.stats.superseded_entries += 1;
            }
        }

        if let Some(previous) = self
            .by_external
            .insert(external.to_string(), internal_key.to_string())
        {
            if previous != internal_key {
                debug!(
                    "Identifier {} re-indexed: internal key {} replaced by {}",
                    external, previous, internal_key
                );
                self.by_internal.remove(&previous);
                self.stats.superseded_entries += 1;
            }
        }
    }

    /// Entries currently indexed
    pub fn len(&self) -> usize {
        self.by_internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_internal.is_empty()
    }

    /// Freeze the index; no entries can be added afterwards
    pub fn finish(mut self) -> IndexBuildOutcome {
        self.stats.unmatched_keys = self.sought.len() - self.by_external.len();

        if self.stats.superseded_entries > 0 {
            warn!(
                "{} alias entries were superseded by later records for the same key",
                self.stats.superseded_entries
            );
        }

        IndexBuildOutcome {
            index: InternalIndex::from_entries(self.by_internal),
            stats: self.stats,
        }
    }
}

/// Run pass 1 over a full alias record stream
///
/// Stops only at the end of the stream or on the first I/O error.
pub fn build_index<I>(records: I, sought: &SoughtKeySet) -> io::Result<IndexBuildOutcome>
where
    I: IntoIterator<Item = io::Result<Record>>,
{
    let mut builder = IndexBuilder::new(sought);
    for record in records {
        builder.observe(&record?);
    }
    Ok(builder.finish())
}
