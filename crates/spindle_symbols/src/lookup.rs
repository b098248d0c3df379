//! Lookup keys and the in-memory lookup tracker.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// A (scope, simple name) pair recording that some code referenced
/// `name` within `scope`.
///
/// The scope is a fully qualified container name (a package or an enclosing
/// class); the name is the simple name that was resolved inside it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LookupKey {
    /// The fully qualified scope the name was resolved in.
    pub scope: String,
    /// The simple name that was looked up.
    pub name: String,
}

impl LookupKey {
    /// Creates a new lookup key.
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// In-memory accumulator of lookup observations for one build.
///
/// Lookups are append-only within a build: the tracker only ever grows, and
/// its contents are merged into persistent storage at the end of a fully
/// successful build. Two independent trackers exist per build — one for
/// symbol-level lookups and one for class-level lookups.
#[derive(Debug, Default)]
pub struct LookupTracker {
    records: BTreeMap<LookupKey, BTreeSet<PathBuf>>,
}

impl LookupTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observation that `file_path` referenced `name` within `scope`.
    pub fn record(&mut self, file_path: &Path, scope: &str, name: &str) {
        self.records
            .entry(LookupKey::new(scope, name))
            .or_default()
            .insert(file_path.to_path_buf());
    }

    /// Returns the files that recorded the given lookup, if any.
    pub fn files_for(&self, key: &LookupKey) -> Option<&BTreeSet<PathBuf>> {
        self.records.get(key)
    }

    /// Iterates over all recorded (key, files) pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&LookupKey, &BTreeSet<PathBuf>)> {
        self.records.iter()
    }

    /// Returns `true` if no lookups have been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of distinct lookup keys recorded.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
