//! The code generator: the sink through which processors create files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::PathBuf;

use spindle_cache::any_changes_path;

use crate::error::EngineError;

/// The kind of output being generated, selecting the output directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    /// A source file; files with a source extension trigger another
    /// processing round.
    Source,
    /// A resource file; participates in the output cache but never triggers
    /// further rounds.
    Resource,
    /// A class file.
    Class,
}

/// Creates generated files and records their association with the sources
/// that produced them.
///
/// Files created here participate in incremental processing: the recorded
/// associations drive output invalidation on later builds. An output created
/// without an association is conservatively associated with the wildcard,
/// meaning it is regenerated whenever any new information exists.
///
/// Creating the same output path twice within one build is an error, even
/// from different processors: outputs must be uniquely attributable.
pub struct CodeGenerator {
    base_dir: PathBuf,
    sources_out: PathBuf,
    resources_out: PathBuf,
    classes_out: PathBuf,
    /// All outputs created this build, as project-relative paths.
    created: BTreeSet<PathBuf>,
    /// Outputs created since the last round boundary.
    new_this_round: Vec<PathBuf>,
    /// Declared output-to-sources associations.
    associations: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl CodeGenerator {
    /// Creates a code generator writing under the given output directories.
    ///
    /// All directories are project-relative; `base_dir` is the project base
    /// they are resolved against.
    pub fn new(
        base_dir: impl Into<PathBuf>,
        sources_out: impl Into<PathBuf>,
        resources_out: impl Into<PathBuf>,
        classes_out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            sources_out: sources_out.into(),
            resources_out: resources_out.into(),
            classes_out: classes_out.into(),
            created: BTreeSet::new(),
            new_this_round: Vec::new(),
            associations: BTreeMap::new(),
        }
    }

    /// Returns the project-relative path an output would be created at.
    ///
    /// The package name maps to a directory path, accepting either `.` or
    /// `/` as separator.
    pub fn output_path(
        &self,
        kind: OutputKind,
        package: &str,
        name: &str,
        extension: &str,
    ) -> PathBuf {
        let dir = match kind {
            OutputKind::Source => &self.sources_out,
            OutputKind::Resource => &self.resources_out,
            OutputKind::Class => &self.classes_out,
        };
        let mut path = dir.clone();
        for part in package.split(['.', '/']).filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.push(format!("{name}.{extension}"));
        path
    }

    /// Creates a new output file and returns a writable handle to it.
    ///
    /// The file is recorded as newly generated this round. Fails with
    /// [`EngineError::FileAlreadyExists`] if the same output path was already
    /// created this build.
    pub fn create_file(
        &mut self,
        kind: OutputKind,
        package: &str,
        name: &str,
        extension: &str,
    ) -> Result<File, EngineError> {
        let relative = self.output_path(kind, package, name, extension);
        if self.created.contains(&relative) {
            return Err(EngineError::FileAlreadyExists { path: relative });
        }

        let on_disk = self.base_dir.join(&relative);
        if let Some(parent) = on_disk.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(&on_disk).map_err(|e| EngineError::Io {
            path: on_disk.clone(),
            source: e,
        })?;

        self.created.insert(relative.clone());
        self.new_this_round.push(relative);
        Ok(file)
    }

    /// Declares that the output's validity depends exactly on this set of
    /// sources.
    ///
    /// This is the fine-grained contract used by well-behaved processors.
    /// Repeated calls for the same output union their source sets. An output
    /// never associated stays on the wildcard.
    pub fn associate(
        &mut self,
        sources: &[PathBuf],
        kind: OutputKind,
        package: &str,
        name: &str,
        extension: &str,
    ) {
        let output = self.output_path(kind, package, name, extension);
        let entry = self.associations.entry(output).or_default();
        entry.extend(sources.iter().cloned());
    }

    /// Declares that the output depends on any new information, forcing
    /// conservative invalidation on every change.
    pub fn associate_with_any_changes(
        &mut self,
        kind: OutputKind,
        package: &str,
        name: &str,
        extension: &str,
    ) {
        let output = self.output_path(kind, package, name, extension);
        self.associations
            .entry(output)
            .or_default()
            .insert(any_changes_path().to_path_buf());
    }

    /// Drains the outputs created since the last round boundary.
    pub fn take_new_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.new_this_round)
    }

    /// Flushes round-level bookkeeping at a round boundary.
    ///
    /// File handles returned by [`create_file`](Self::create_file) close on
    /// drop; this only asserts the round invariant that all of them have
    /// been.
    pub fn close_files(&mut self) {
        debug_assert!(
            self.new_this_round.is_empty(),
            "take_new_files must run before close_files"
        );
    }

    /// Returns every output created this build.
    pub fn outputs(&self) -> &BTreeSet<PathBuf> {
        &self.created
    }

    /// Builds the source-to-outputs map committed into the output cache.
    ///
    /// Outputs with no declared association are attributed to the wildcard:
    /// they can never be incrementally invalidated, only conservatively
    /// regenerated.
    pub fn source_to_outputs(&self) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
        let mut map: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
        for output in &self.created {
            match self.associations.get(output) {
                Some(sources) if !sources.is_empty() => {
                    for source in sources {
                        map.entry(source.clone()).or_default().insert(output.clone());
                    }
                }
                _ => {
                    map.entry(any_changes_path().to_path_buf())
                        .or_default()
                        .insert(output.clone());
                }
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn generator(base: &Path) -> CodeGenerator {
        CodeGenerator::new(
            base,
            "gen/sources",
            "gen/resources",
            "gen/classes",
        )
    }

    #[test]
    fn output_path_maps_package_to_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());
        let path = generator.output_path(OutputKind::Source, "com.example", "Foo", "kt");
        assert_eq!(path, PathBuf::from("gen/sources/com/example/Foo.kt"));

        let slashed = generator.output_path(OutputKind::Resource, "com/example", "data", "json");
        assert_eq!(slashed, PathBuf::from("gen/resources/com/example/data.json"));
    }

    #[test]
    fn create_file_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        let mut file = generator
            .create_file(OutputKind::Source, "com.example", "Foo", "kt")
            .unwrap();
        file.write_all(b"class Foo").unwrap();
        drop(file);

        let on_disk = dir.path().join("gen/sources/com/example/Foo.kt");
        assert_eq!(std::fs::read_to_string(on_disk).unwrap(), "class Foo");
    }

    #[test]
    fn duplicate_creation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "com.example", "Foo", "kt")
            .unwrap();
        let err = generator
            .create_file(OutputKind::Source, "com.example", "Foo", "kt")
            .unwrap_err();
        assert!(matches!(err, EngineError::FileAlreadyExists { .. }));
    }

    #[test]
    fn take_new_files_drains_per_round() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "p", "A", "kt")
            .unwrap();
        assert_eq!(generator.take_new_files().len(), 1);
        assert!(generator.take_new_files().is_empty());

        generator
            .create_file(OutputKind::Source, "p", "B", "kt")
            .unwrap();
        assert_eq!(generator.take_new_files().len(), 1);
        assert_eq!(generator.outputs().len(), 2);
    }

    #[test]
    fn associated_outputs_map_to_their_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "p", "FooImpl", "kt")
            .unwrap();
        generator.associate(
            &[PathBuf::from("src/Foo.kt")],
            OutputKind::Source,
            "p",
            "FooImpl",
            "kt",
        );

        let map = generator.source_to_outputs();
        assert!(map[Path::new("src/Foo.kt")].contains(Path::new("gen/sources/p/FooImpl.kt")));
    }

    #[test]
    fn unassociated_outputs_fall_back_to_wildcard() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "p", "Registry", "kt")
            .unwrap();

        let map = generator.source_to_outputs();
        assert!(map[any_changes_path()].contains(Path::new("gen/sources/p/Registry.kt")));
    }

    #[test]
    fn explicit_wildcard_association() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "p", "Index", "kt")
            .unwrap();
        generator.associate_with_any_changes(OutputKind::Source, "p", "Index", "kt");

        let map = generator.source_to_outputs();
        assert!(map[any_changes_path()].contains(Path::new("gen/sources/p/Index.kt")));
    }

    #[test]
    fn repeated_associate_unions_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator(dir.path());

        generator
            .create_file(OutputKind::Source, "p", "Joined", "kt")
            .unwrap();
        generator.associate(
            &[PathBuf::from("src/A.kt")],
            OutputKind::Source,
            "p",
            "Joined",
            "kt",
        );
        generator.associate(
            &[PathBuf::from("src/B.kt")],
            OutputKind::Source,
            "p",
            "Joined",
            "kt",
        );

        let map = generator.source_to_outputs();
        assert!(map.contains_key(Path::new("src/A.kt")));
        assert!(map.contains_key(Path::new("src/B.kt")));
    }
}
