//! Persistent multi-map from lookup keys to the files that recorded them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use spindle_symbols::{LookupKey, LookupTracker};

use crate::error::CacheError;
use crate::store::{read_store, write_store};

/// Persistent storage of lookup observations: which files referenced which
/// (scope, simple name) pairs, as of the last successful build.
///
/// Two independent instances exist per build — symbol-level and class-level —
/// because "does this file use class Foo" and "does this file use member
/// Foo.bar" have different granularity and different false-positive costs;
/// merging them would over-invalidate on unrelated member additions to large
/// classes.
///
/// Mutations happen in memory; nothing reaches disk until [`flush`](Self::flush)
/// is called at commit time. Dropping the storage without flushing leaves the
/// on-disk state untouched, which is how a failed build avoids corrupting the
/// next build's dirty-set computation.
pub struct LookupStorage {
    path: PathBuf,
    map: BTreeMap<LookupKey, BTreeSet<PathBuf>>,
    modified: bool,
}

impl LookupStorage {
    /// Opens the storage at the given file path, creating an empty one if the
    /// file does not exist. Corruption is a hard error.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let map = read_store(path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            map,
            modified: false,
        })
    }

    /// Returns all file paths that recorded the given lookup.
    pub fn get(&self, key: &LookupKey) -> Option<&BTreeSet<PathBuf>> {
        self.map.get(key)
    }

    /// Returns all file paths that recorded a lookup of `name` in any scope.
    ///
    /// Used to translate a changed classpath entry (known only by class name)
    /// into the set of possibly affected files.
    pub fn files_for_name(&self, name: &str) -> BTreeSet<PathBuf> {
        self.map
            .iter()
            .filter(|(key, _)| key.name == name)
            .flat_map(|(_, files)| files.iter().cloned())
            .collect()
    }

    /// Merges newly recorded lookups for `compiled_files` into storage and
    /// purges all records of `removed_files`.
    ///
    /// Records of recompiled files are purged before merging: their lookups
    /// were re-recorded from scratch this build, and stale entries would
    /// over-invalidate on later builds.
    pub fn update(
        &mut self,
        tracker: &LookupTracker,
        compiled_files: &BTreeSet<PathBuf>,
        removed_files: &BTreeSet<PathBuf>,
    ) {
        self.purge(|file| compiled_files.contains(file) || removed_files.contains(file));
        for (key, files) in tracker.iter() {
            let recorded: Vec<&PathBuf> =
                files.iter().filter(|f| compiled_files.contains(*f)).collect();
            if recorded.is_empty() {
                continue;
            }
            let entry = self.map.entry(key.clone()).or_default();
            for file in recorded {
                entry.insert(file.clone());
            }
        }
        self.modified = true;
    }

    /// Purges all lookup records of the given files without merging new data.
    ///
    /// Used when a file's lookups must be invalidated without replacement,
    /// e.g. for files removed since the last build.
    pub fn remove_lookups_from(&mut self, files: &BTreeSet<PathBuf>) {
        self.purge(|file| files.contains(file));
        self.modified = true;
    }

    fn purge(&mut self, mut predicate: impl FnMut(&PathBuf) -> bool) {
        self.map.retain(|_, files| {
            files.retain(|f| !predicate(f));
            !files.is_empty()
        });
    }

    /// Writes the current state to disk.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        write_store(&self.path, &self.map)?;
        self.modified = false;
        Ok(())
    }

    /// Returns `true` if the storage has unflushed modifications.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns the number of distinct lookup keys stored.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no lookups are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all stored (key, files) pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&LookupKey, &BTreeSet<PathBuf>)> {
        self.map.iter()
    }
}
