//! Source file hashing and change detection.
//!
//! Computes content hashes for source files and compares them against the
//! persisted hash snapshot to identify which files are new, modified,
//! deleted, or unchanged since the last successful build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use spindle_cache::{CacheError, FileHashMap};
use spindle_common::ContentHash;

/// Result of comparing current source file hashes against the hash snapshot.
///
/// Categorizes all files into new (never seen), modified (hash changed),
/// deleted (in the snapshot but not on disk), and unchanged (hash matches).
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Files that are not present in the snapshot.
    pub new_files: Vec<PathBuf>,

    /// Files whose content hash differs from the snapshot.
    pub modified_files: Vec<PathBuf>,

    /// Files present in the snapshot but not in the current file set.
    pub deleted_files: Vec<PathBuf>,

    /// Files whose content hash matches the snapshot.
    pub unchanged_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if there are no changes (no new, modified, or deleted files).
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the total number of files that need reprocessing (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }
}

/// Utility for computing content hashes of source files and detecting changes.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    ///
    /// Reads the file and returns its XXH3-128 content hash. The hash is
    /// byte-level: whitespace-only and comment-only edits count as changes.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ContentHash::from_bytes(&content))
    }

    /// Computes content hashes for multiple project-relative paths.
    ///
    /// Each path is joined onto `base_dir` for reading; the returned map is
    /// keyed by the relative path. Files that cannot be read are silently
    /// skipped (they will appear as deleted in the change set).
    pub fn hash_files(base_dir: &Path, paths: &[PathBuf]) -> BTreeMap<PathBuf, ContentHash> {
        let mut hashes = BTreeMap::new();
        for path in paths {
            if let Ok(hash) = Self::hash_file(&base_dir.join(path)) {
                hashes.insert(path.clone(), hash);
            }
        }
        hashes
    }

    /// Compares current file hashes against the hash snapshot to detect changes.
    ///
    /// Files are categorized as new (not in the snapshot), modified (hash
    /// changed), deleted (in the snapshot but not in the current set), or
    /// unchanged.
    pub fn detect_changes(
        current_hashes: &BTreeMap<PathBuf, ContentHash>,
        snapshot: &FileHashMap,
    ) -> ChangeSet {
        let mut new_files = Vec::new();
        let mut modified_files = Vec::new();
        let mut unchanged_files = Vec::new();

        for (path, hash) in current_hashes {
            match snapshot.get(path) {
                Some(recorded) if recorded == hash => {
                    unchanged_files.push(path.clone());
                }
                Some(_) => {
                    modified_files.push(path.clone());
                }
                None => {
                    new_files.push(path.clone());
                }
            }
        }

        let mut deleted_files: Vec<PathBuf> = snapshot
            .iter()
            .filter(|(p, _)| !current_hashes.contains_key(*p))
            .map(|(p, _)| p.clone())
            .collect();

        // Sort for deterministic ordering in tests
        new_files.sort();
        modified_files.sort();
        unchanged_files.sort();
        deleted_files.sort();

        ChangeSet {
            new_files,
            modified_files,
            deleted_files,
            unchanged_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(dir: &Path, entries: &[(&str, &[u8])]) -> FileHashMap {
        let mut map = FileHashMap::open(&dir.join("hashes.bin")).unwrap();
        let hashes = entries
            .iter()
            .map(|(p, content)| (PathBuf::from(p), ContentHash::from_bytes(content)))
            .collect();
        map.replace_all(hashes);
        map
    }

    #[test]
    fn hash_file_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.kt");
        std::fs::write(&path, "class Foo").unwrap();

        let h1 = SourceHasher::hash_file(&path).unwrap();
        let h2 = SourceHasher::hash_file(&path).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_file_nonexistent_errors() {
        let result = SourceHasher::hash_file(Path::new("/nonexistent/A.kt"));
        assert!(result.is_err());
    }

    #[test]
    fn hash_files_keyed_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/A.kt"), "class A").unwrap();

        let hashes = SourceHasher::hash_files(dir.path(), &[PathBuf::from("src/A.kt")]);
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key(Path::new("src/A.kt")));
    }

    #[test]
    fn detect_changes_all_new() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot_with(dir.path(), &[]);

        let mut hashes = BTreeMap::new();
        hashes.insert(PathBuf::from("src/A.kt"), ContentHash::from_bytes(b"a"));
        hashes.insert(PathBuf::from("src/B.kt"), ContentHash::from_bytes(b"b"));

        let cs = SourceHasher::detect_changes(&hashes, &snapshot);
        assert_eq!(cs.new_files.len(), 2);
        assert!(cs.modified_files.is_empty());
        assert!(cs.deleted_files.is_empty());
        assert_eq!(cs.dirty_count(), 2);
    }

    #[test]
    fn detect_changes_all_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot_with(dir.path(), &[("src/A.kt", b"a")]);

        let mut hashes = BTreeMap::new();
        hashes.insert(PathBuf::from("src/A.kt"), ContentHash::from_bytes(b"a"));

        let cs = SourceHasher::detect_changes(&hashes, &snapshot);
        assert!(cs.is_empty());
        assert_eq!(cs.unchanged_files.len(), 1);
    }

    #[test]
    fn detect_changes_modified() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot_with(dir.path(), &[("src/A.kt", b"old")]);

        let mut hashes = BTreeMap::new();
        hashes.insert(PathBuf::from("src/A.kt"), ContentHash::from_bytes(b"new"));

        let cs = SourceHasher::detect_changes(&hashes, &snapshot);
        assert_eq!(cs.modified_files, vec![PathBuf::from("src/A.kt")]);
        assert!(!cs.is_empty());
    }

    #[test]
    fn detect_changes_whitespace_counts() {
        // The documented policy: change detection is byte-level, so a
        // whitespace-only edit marks the file as modified.
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot_with(dir.path(), &[("src/A.kt", b"class Foo")]);

        let mut hashes = BTreeMap::new();
        hashes.insert(
            PathBuf::from("src/A.kt"),
            ContentHash::from_bytes(b"class Foo\n"),
        );

        let cs = SourceHasher::detect_changes(&hashes, &snapshot);
        assert_eq!(cs.modified_files.len(), 1);
    }

    #[test]
    fn detect_changes_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot_with(dir.path(), &[("src/Gone.kt", b"x")]);

        let cs = SourceHasher::detect_changes(&BTreeMap::new(), &snapshot);
        assert_eq!(cs.deleted_files, vec![PathBuf::from("src/Gone.kt")]);
    }
}
