//! Resolution data model
//!
//! - [`SoughtKeySet`]: external identifiers the caller wants resolved;
//!   immutable once built.
//! - [`InternalIndex`]: `internal_key → external_identifier`, produced by
//!   pass 1 and only read afterwards.
//! - [`ResolvedMap`]: `external_identifier → stable_uuid`, grown by pass 2
//!   in match order.

use std::collections::{HashMap, HashSet};

/// Set of external identifiers to resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoughtKeySet {
    keys: HashSet<String>,
}

impl SoughtKeySet {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SoughtKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Frozen pass 1 output
///
/// One-to-one: every internal key maps to a distinct sought identifier, so
/// `len() <= SoughtKeySet::len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalIndex {
    entries: HashMap<String, String>,
}

impl InternalIndex {
    pub(crate) fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// External identifier the internal key was indexed under
    pub fn get(&self, internal_key: &str) -> Option<&str> {
        self.entries.get(internal_key).map(String::as_str)
    }

    pub fn contains(&self, internal_key: &str) -> bool {
        self.entries.contains_key(internal_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(internal_key, external_identifier)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolved `external_identifier → stable_uuid` pairs in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMap {
    pairs: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl ResolvedMap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Insert unless the identifier is already resolved (first match wins)
    ///
    /// Returns `false` when an earlier match was kept.
    pub fn insert(&mut self, external_identifier: &str, stable_uuid: &str) -> bool {
        if self.positions.contains_key(external_identifier) {
            return false;
        }
        self.positions
            .insert(external_identifier.to_string(), self.pairs.len());
        self.pairs
            .push((external_identifier.to_string(), stable_uuid.to_string()));
        true
    }

    pub fn get(&self, external_identifier: &str) -> Option<&str> {
        self.positions
            .get(external_identifier)
            .map(|&i| self.pairs[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in the order they were matched
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
