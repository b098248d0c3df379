//! Persistent bidirectional map between source files and generated outputs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::store::{read_store, write_store};

/// Name of the pseudo-source meaning "this output depends on any new
/// information". Outputs associated with it are conservatively invalidated
/// whenever a file is added, removed, or changed in a symbol-affecting way.
pub const ANY_CHANGES_NAME: &str = "<any-changes>";

/// Returns the wildcard pseudo-source path.
pub fn any_changes_path() -> &'static Path {
    Path::new(ANY_CHANGES_NAME)
}

/// Persistent source-to-output associations.
///
/// Stores, per source file, the set of generated outputs it produced, and
/// answers the reverse question of which sources produced a given output.
/// Every output except wildcard-associated ones is traceable to at least one
/// source; an output with no declared association cannot be incrementally
/// invalidated and is recorded against the wildcard by the code generator.
///
/// Only the forward map is persisted; the reverse map is rebuilt on open.
pub struct OutputMap {
    path: PathBuf,
    source_to_outputs: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    output_to_sources: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    modified: bool,
}

impl OutputMap {
    /// Opens the map at the given file path, creating an empty one if the
    /// file does not exist. Corruption is a hard error.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let source_to_outputs: BTreeMap<PathBuf, BTreeSet<PathBuf>> =
            read_store(path)?.unwrap_or_default();
        let output_to_sources = invert(&source_to_outputs);
        Ok(Self {
            path: path.to_path_buf(),
            source_to_outputs,
            output_to_sources,
            modified: false,
        })
    }

    /// Records that `output` was produced from each of `sources`.
    pub fn associate(&mut self, sources: &BTreeSet<PathBuf>, output: &Path) {
        for source in sources {
            self.source_to_outputs
                .entry(source.clone())
                .or_default()
                .insert(output.to_path_buf());
            self.output_to_sources
                .entry(output.to_path_buf())
                .or_default()
                .insert(source.clone());
        }
        self.modified = true;
    }

    /// Returns the outputs produced from the given source, including
    /// wildcard-associated outputs.
    pub fn outputs_of(&self, source: &Path) -> BTreeSet<PathBuf> {
        let mut outputs = self
            .source_to_outputs
            .get(source)
            .cloned()
            .unwrap_or_default();
        outputs.extend(self.wildcard_outputs());
        outputs
    }

    /// Returns the outputs produced from exactly the given source, without
    /// wildcard outputs.
    pub fn outputs_of_exactly(&self, source: &Path) -> Option<&BTreeSet<PathBuf>> {
        self.source_to_outputs.get(source)
    }

    /// Returns the sources that produced the given output.
    pub fn sources_of(&self, output: &Path) -> Option<&BTreeSet<PathBuf>> {
        self.output_to_sources.get(output)
    }

    /// Returns the outputs associated with the wildcard pseudo-source.
    pub fn wildcard_outputs(&self) -> BTreeSet<PathBuf> {
        self.source_to_outputs
            .get(any_changes_path())
            .cloned()
            .unwrap_or_default()
    }

    /// Removes a source and its associations, returning the outputs that are
    /// now orphaned (no remaining source produces them).
    pub fn remove_source(&mut self, source: &Path) -> BTreeSet<PathBuf> {
        let outputs = self.source_to_outputs.remove(source).unwrap_or_default();
        let mut orphaned = BTreeSet::new();
        for output in outputs {
            if let Some(sources) = self.output_to_sources.get_mut(&output) {
                sources.remove(source);
                if sources.is_empty() {
                    self.output_to_sources.remove(&output);
                    orphaned.insert(output);
                }
            }
        }
        self.modified = true;
        orphaned
    }

    /// Removes an output and its associations from both directions.
    pub fn remove_output(&mut self, output: &Path) {
        if let Some(sources) = self.output_to_sources.remove(output) {
            for source in sources {
                if let Some(outputs) = self.source_to_outputs.get_mut(&source) {
                    outputs.remove(output);
                    if outputs.is_empty() {
                        self.source_to_outputs.remove(&source);
                    }
                }
            }
            self.modified = true;
        }
    }

    /// Replaces the associations of the given source with a new output set.
    pub fn replace_source(&mut self, source: &Path, outputs: BTreeSet<PathBuf>) {
        self.remove_source(source);
        for output in &outputs {
            self.associate(&BTreeSet::from([source.to_path_buf()]), output);
        }
        self.modified = true;
    }

    /// Writes the current state to disk.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        write_store(&self.path, &self.source_to_outputs)?;
        self.modified = false;
        Ok(())
    }

    /// Returns the number of sources with recorded outputs (including the
    /// wildcard pseudo-source if present).
    pub fn len(&self) -> usize {
        self.source_to_outputs.len()
    }

    /// Returns `true` if no associations are recorded.
    pub fn is_empty(&self) -> bool {
        self.source_to_outputs.is_empty()
    }
}

fn invert(
    forward: &BTreeMap<PathBuf, BTreeSet<PathBuf>>,
) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
    let mut reverse: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    for (source, outputs) in forward {
        for output in outputs {
            reverse
                .entry(output.clone())
                .or_default()
                .insert(source.clone());
        }
    }
    reverse
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> BTreeSet<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn associate_and_query_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = OutputMap::open(&dir.path().join("outputs.bin")).unwrap();

        map.associate(&paths(&["src/A.kt"]), Path::new("gen/Foo.kt"));

        assert!(map
            .outputs_of(Path::new("src/A.kt"))
            .contains(Path::new("gen/Foo.kt")));
        assert_eq!(
            map.sources_of(Path::new("gen/Foo.kt")).unwrap(),
            &paths(&["src/A.kt"])
        );
    }

    #[test]
    fn wildcard_outputs_appear_for_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = OutputMap::open(&dir.path().join("outputs.bin")).unwrap();

        map.associate(
            &BTreeSet::from([any_changes_path().to_path_buf()]),
            Path::new("gen/Registry.kt"),
        );
        map.associate(&paths(&["src/A.kt"]), Path::new("gen/Foo.kt"));

        let outputs = map.outputs_of(Path::new("src/A.kt"));
        assert!(outputs.contains(Path::new("gen/Registry.kt")));
        assert!(outputs.contains(Path::new("gen/Foo.kt")));

        // The exact view excludes the wildcard.
        assert!(!map
            .outputs_of_exactly(Path::new("src/A.kt"))
            .unwrap()
            .contains(Path::new("gen/Registry.kt")));
    }

    #[test]
    fn remove_source_reports_orphaned_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = OutputMap::open(&dir.path().join("outputs.bin")).unwrap();

        // gen/Shared.kt has two sources, gen/Solo.kt has one.
        map.associate(&paths(&["src/A.kt", "src/B.kt"]), Path::new("gen/Shared.kt"));
        map.associate(&paths(&["src/A.kt"]), Path::new("gen/Solo.kt"));

        let orphaned = map.remove_source(Path::new("src/A.kt"));
        assert_eq!(orphaned, paths(&["gen/Solo.kt"]));
        assert_eq!(
            map.sources_of(Path::new("gen/Shared.kt")).unwrap(),
            &paths(&["src/B.kt"])
        );
    }

    #[test]
    fn remove_output_cleans_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = OutputMap::open(&dir.path().join("outputs.bin")).unwrap();

        map.associate(&paths(&["src/A.kt"]), Path::new("gen/Foo.kt"));
        map.remove_output(Path::new("gen/Foo.kt"));

        assert!(map.sources_of(Path::new("gen/Foo.kt")).is_none());
        assert!(map.outputs_of_exactly(Path::new("src/A.kt")).is_none());
    }

    #[test]
    fn replace_source_installs_new_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = OutputMap::open(&dir.path().join("outputs.bin")).unwrap();

        map.associate(&paths(&["src/A.kt"]), Path::new("gen/Old.kt"));
        map.replace_source(Path::new("src/A.kt"), paths(&["gen/New.kt"]));

        let outputs = map.outputs_of_exactly(Path::new("src/A.kt")).unwrap();
        assert!(outputs.contains(Path::new("gen/New.kt")));
        assert!(!outputs.contains(Path::new("gen/Old.kt")));
        assert!(map.sources_of(Path::new("gen/Old.kt")).is_none());
    }

    #[test]
    fn flush_and_reopen_rebuilds_reverse_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs.bin");
        {
            let mut map = OutputMap::open(&path).unwrap();
            map.associate(&paths(&["src/A.kt", "src/B.kt"]), Path::new("gen/Foo.kt"));
            map.flush().unwrap();
        }
        let map = OutputMap::open(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.is_empty());
        assert_eq!(
            map.sources_of(Path::new("gen/Foo.kt")).unwrap(),
            &paths(&["src/A.kt", "src/B.kt"])
        );
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs.bin");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(OutputMap::open(&path).is_err());
    }
}
