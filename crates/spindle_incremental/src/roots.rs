//! Source root traversal with symlink deduplication.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Walks the given source roots and returns project-relative paths of all
/// files with one of the given extensions.
///
/// Roots and files reached through symbolic links are deduplicated against
/// their canonical paths, with non-symlink paths preferred as canonical when
/// duplicates exist across roots. This makes file identity deterministic when
/// the same directory is mounted both directly and through a link.
pub fn walk_source_roots(
    base_dir: &Path,
    roots: &[PathBuf],
    extensions: &[String],
) -> Vec<PathBuf> {
    let canonical_base = base_dir.canonicalize().unwrap_or_else(|_| base_dir.to_path_buf());

    // Non-symlink roots first, so their files claim the canonical identity.
    let mut ordered_roots: Vec<&PathBuf> = roots.iter().collect();
    ordered_roots.sort_by_key(|r| is_symlink(r));

    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for root in ordered_roots {
        let mut entries: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| has_extension(p, extensions))
            .collect();
        // Within a root, non-symlink files first for the same reason.
        entries.sort();
        entries.sort_by_key(|p| is_symlink(p));

        for path in entries {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(canonical.clone()) {
                continue;
            }
            let relative = canonical
                .strip_prefix(&canonical_base)
                .map(Path::to_path_buf)
                .unwrap_or(canonical);
            result.push(relative);
        }
    }

    result.sort();
    result
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x == e))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["kt".to_string(), "java".to_string()]
    }

    #[test]
    fn walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("com/example")).unwrap();
        std::fs::write(src.join("A.kt"), "class A").unwrap();
        std::fs::write(src.join("com/example/B.kt"), "class B").unwrap();
        std::fs::write(src.join("notes.txt"), "skip me").unwrap();

        let files = walk_source_roots(dir.path(), &[src], &exts());
        assert_eq!(
            files,
            vec![
                PathBuf::from("src/A.kt"),
                PathBuf::from("src/com/example/B.kt")
            ]
        );
    }

    #[test]
    fn filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("A.kt"), "class A").unwrap();
        std::fs::write(src.join("B.java"), "class B {}").unwrap();
        std::fs::write(src.join("C.scala"), "class C").unwrap();

        let files = walk_source_roots(dir.path(), &[src], &vec!["kt".to_string()]);
        assert_eq!(files, vec![PathBuf::from("src/A.kt")]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = walk_source_roots(dir.path(), &[dir.path().join("nope")], &exts());
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_duplicate_root_is_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("A.kt"), "class A").unwrap();

        let link = dir.path().join("src_link");
        std::os::unix::fs::symlink(&src, &link).unwrap();

        let files = walk_source_roots(dir.path(), &[src, link], &exts());
        // One logical file, identified by its non-symlink path.
        assert_eq!(files, vec![PathBuf::from("src/A.kt")]);
    }
}
