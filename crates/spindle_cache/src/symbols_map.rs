//! Persistent map from source files to the symbols they declare.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use spindle_symbols::LookupKey;

use crate::error::CacheError;
use crate::store::{read_store, write_store};

/// Persistent per-file symbol sets.
///
/// Two instances exist per build: the *symbols map* records every scoped
/// symbol a file declares (used to find files affected when a dirty file's
/// declarations change), and the *sealed map* records the sealed hierarchies
/// a file contributes members to (used to invalidate exhaustiveness-dependent
/// generated code when membership changes).
///
/// This is pure storage: queries are O(log n) by path and no cross-file
/// computation happens here.
pub struct FileSymbolsMap {
    path: PathBuf,
    map: BTreeMap<PathBuf, BTreeSet<LookupKey>>,
    modified: bool,
}

impl FileSymbolsMap {
    /// Opens the map at the given file path, creating an empty one if the
    /// file does not exist. Corruption is a hard error.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let map = read_store(path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            map,
            modified: false,
        })
    }

    /// Returns the symbols recorded for the given file, if any.
    ///
    /// `None` means the file has never been successfully processed; callers
    /// treat such files as conservatively dirty.
    pub fn get(&self, file: &Path) -> Option<&BTreeSet<LookupKey>> {
        self.map.get(file)
    }

    /// Returns `true` if the file has a recorded entry (possibly empty).
    pub fn contains(&self, file: &Path) -> bool {
        self.map.contains_key(file)
    }

    /// Replaces the recorded symbol set for the given file.
    pub fn set(&mut self, file: &Path, symbols: BTreeSet<LookupKey>) {
        self.map.insert(file.to_path_buf(), symbols);
        self.modified = true;
    }

    /// Removes the recorded entry for the given file, returning the symbols
    /// it declared.
    pub fn remove(&mut self, file: &Path) -> Option<BTreeSet<LookupKey>> {
        let removed = self.map.remove(file);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Writes the current state to disk.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        write_store(&self.path, &self.map)?;
        self.modified = false;
        Ok(())
    }

    /// Returns the number of files with recorded entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
