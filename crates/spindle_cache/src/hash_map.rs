//! Persistent snapshot of source file content hashes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use spindle_common::ContentHash;

use crate::error::CacheError;
use crate::store::{read_store, write_store};

/// Persistent map from source file path to the content hash observed at the
/// end of the last successful build.
///
/// Used when the host does not supply an explicit changed-file list: current
/// hashes are diffed against this snapshot to derive the new, modified, and
/// deleted file sets.
pub struct FileHashMap {
    path: PathBuf,
    map: BTreeMap<PathBuf, ContentHash>,
    modified: bool,
}

impl FileHashMap {
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

    /// Returns the recorded hash for the given file, if any.
    pub fn get(&self, file: &Path) -> Option<&ContentHash> {
        self.map.get(file)
    }

    /// Replaces the full snapshot with the given hashes.
    pub fn replace_all(&mut self, hashes: BTreeMap<PathBuf, ContentHash>) {
        self.map = hashes;
        self.modified = true;
    }

    /// Iterates over all recorded (path, hash) pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ContentHash)> {
        self.map.iter()
    }

    /// Writes the current state to disk.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        write_store(&self.path, &self.map)?;
        self.modified = false;
        Ok(())
    }

    /// Returns the number of files in the snapshot.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
