//! The incremental context: cache ownership, dirty-set computation, and
//! commit of the post-build cache state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use spindle_cache::{
    any_changes_path, CacheError, FileHashMap, FileSymbolsMap, LookupStorage, OutputMap,
};
use spindle_common::{ContentHash, Interner};
use spindle_diagnostics::{Diagnostic, DiagnosticSink};
use spindle_symbols::{LookupTracker, SourceFile};

use crate::hasher::SourceHasher;

/// How changed files are determined at the start of a build.
#[derive(Debug, Clone)]
pub enum Changes {
    /// The host supplies the changed and removed file lists (project-relative
    /// paths), e.g. from build-tool file watching.
    Known {
        /// Files whose text changed since the last build.
        modified: Vec<PathBuf>,
        /// Files removed since the last build.
        removed: Vec<PathBuf>,
    },
    /// Derive changes by hashing the current file set and diffing against the
    /// persisted hash snapshot.
    Detect,
}

/// Options controlling one build's incremental behavior.
#[derive(Debug, Clone)]
pub struct IncrementalOptions {
    /// Master switch; when `false` the dirty-set computation is skipped and
    /// every file is reprocessed.
    pub incremental: bool,
    /// Whether classpath changes are translated into fine-grained lookups.
    pub intermodule: bool,
    /// Emit one diagnostic line per dirty file naming the reason.
    pub incremental_log: bool,
    /// The project base directory; all cached paths are relative to it.
    pub base_dir: PathBuf,
    /// Directory holding the persistent cache stores.
    pub cache_dir: PathBuf,
    /// How changed files are determined.
    pub changes: Changes,
    /// Fully qualified names of classpath classes whose binary signature
    /// changed, was added, or was removed since the last build.
    pub changed_classes: Vec<String>,
}

/// Owns the persistent caches for one build and computes the dirty set.
///
/// The context is created at the Initializing state of the round loop and
/// lives until the build terminates. All cache mutations happen in memory;
/// [`update_caches_and_outputs`](Self::update_caches_and_outputs) flushes
/// them to disk and is only called after a fully successful build. A build
/// that errors simply drops the context, leaving the on-disk caches at their
/// pre-build state.
pub struct IncrementalContext {
    opts: IncrementalOptions,
    symbol_lookups: LookupStorage,
    class_lookups: LookupStorage,
    sealed_map: FileSymbolsMap,
    symbols_map: FileSymbolsMap,
    output_map: OutputMap,
    hashes: FileHashMap,
    /// Symbol-level lookup observations recorded this build.
    pub symbol_tracker: LookupTracker,
    /// Class-level lookup observations recorded this build.
    pub class_tracker: LookupTracker,
    modified: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
    current_hashes: BTreeMap<PathBuf, ContentHash>,
    generated: BTreeSet<PathBuf>,
}

impl IncrementalContext {
    /// Opens all cache stores under the configured cache directory.
    ///
    /// Missing stores start empty (a fresh cache); corrupt stores are a hard
    /// error — the explicit escape hatch is disabling incremental processing.
    pub fn open(opts: IncrementalOptions) -> Result<Self, CacheError> {
        let dir = &opts.cache_dir;
        Ok(Self {
            symbol_lookups: LookupStorage::open(&dir.join("symbol_lookups.bin"))?,
            class_lookups: LookupStorage::open(&dir.join("class_lookups.bin"))?,
            sealed_map: FileSymbolsMap::open(&dir.join("sealed.bin"))?,
            symbols_map: FileSymbolsMap::open(&dir.join("symbols.bin"))?,
            output_map: OutputMap::open(&dir.join("outputs.bin"))?,
            hashes: FileHashMap::open(&dir.join("hashes.bin"))?,
            symbol_tracker: LookupTracker::new(),
            class_tracker: LookupTracker::new(),
            modified: BTreeSet::new(),
            removed: BTreeSet::new(),
            current_hashes: BTreeMap::new(),
            generated: BTreeSet::new(),
            opts,
        })
    }

    /// Computes the set of files requiring reprocessing this build.
    ///
    /// `files` is the full current file set with parsed declarations. The
    /// result is a transitive fixed point: a file is dirty if its content
    /// changed, if it references a symbol declared by a dirty or removed
    /// file, if it switches over a sealed hierarchy whose membership a dirty
    /// file contributes to, if it co-generates an output with a dirty file,
    /// or if it has no recorded processing history. Propagation considers
    /// both the symbols a dirty file currently declares and the symbols it
    /// declared in the previous snapshot, so additions and removals both
    /// invalidate their dependents.
    ///
    /// Stale outputs (outputs of dirty sources, orphaned outputs of removed
    /// sources, and wildcard-associated outputs once any new information
    /// exists) are deleted from disk here so they cannot survive the build
    /// without being regenerated.
    pub fn calc_dirty_files(
        &mut self,
        files: &[SourceFile],
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> Result<BTreeSet<PathBuf>, CacheError> {
        let current: BTreeSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let by_path: BTreeMap<&Path, &SourceFile> =
            files.iter().map(|f| (f.path.as_path(), f)).collect();
        let paths: Vec<PathBuf> = current.iter().cloned().collect();

        if !self.opts.incremental {
            self.log(sink, "incremental processing disabled, all files dirty");
            return Ok(current);
        }

        self.current_hashes = SourceHasher::hash_files(&self.opts.base_dir, &paths);
        let added: BTreeSet<PathBuf> = paths
            .iter()
            .filter(|f| self.hashes.get(f).is_none())
            .cloned()
            .collect();

        match self.opts.changes.clone() {
            Changes::Known { modified, removed } => {
                self.modified = modified.into_iter().filter(|f| current.contains(f)).collect();
                self.removed = removed.into_iter().collect();
            }
            Changes::Detect => {
                let change_set = SourceHasher::detect_changes(&self.current_hashes, &self.hashes);
                self.modified = change_set
                    .modified_files
                    .iter()
                    .chain(change_set.new_files.iter())
                    .cloned()
                    .collect();
                self.removed = change_set.deleted_files.into_iter().collect();
            }
        }

        // Conservative fallback: without intermodule incrementality, a
        // classpath change invalidates everything.
        if !self.opts.changed_classes.is_empty() && !self.opts.intermodule {
            self.log(sink, "classpath changed, intermodule incrementality disabled");
            return Ok(current);
        }

        let mut dirty = BTreeSet::new();
        for file in &self.modified {
            if dirty.insert(file.clone()) {
                self.log_dirty(sink, file, "content changed");
            }
        }

        // Files with no recorded history cannot be invalidated precisely.
        for file in &current {
            if !self.symbols_map.contains(file) && dirty.insert(file.clone()) {
                self.log_dirty(sink, file, "no processing history");
            }
        }

        // Classpath changes: translate each changed class's simple name into
        // lookups in any accessible scope.
        for class in &self.opts.changed_classes.clone() {
            let simple_name = class.rsplit('.').next().unwrap_or(class.as_str());
            let mut affected = self.symbol_lookups.files_for_name(simple_name);
            affected.extend(self.class_lookups.files_for_name(simple_name));
            for file in affected {
                if current.contains(&file) && dirty.insert(file.clone()) {
                    self.log_dirty(sink, &file, "classpath change");
                }
            }
        }

        // Removed files: purge their records and dirty their dependents.
        for removed in &self.removed.clone() {
            let declared = self.symbols_map.remove(removed).unwrap_or_default();
            for key in &declared {
                let mut consumers = self
                    .symbol_lookups
                    .get(key)
                    .cloned()
                    .unwrap_or_default();
                if let Some(class_consumers) = self.class_lookups.get(key) {
                    consumers.extend(class_consumers.iter().cloned());
                }
                for consumer in consumers {
                    if current.contains(&consumer) && dirty.insert(consumer.clone()) {
                        self.log_dirty(sink, &consumer, "references symbol of removed file");
                    }
                }
            }
            self.sealed_map.remove(removed);

            let orphaned = self.output_map.remove_source(removed);
            for output in orphaned {
                self.delete_output(sink, &output);
            }

            let just_this = BTreeSet::from([removed.clone()]);
            self.symbol_lookups.remove_lookups_from(&just_this);
            self.class_lookups.remove_lookups_from(&just_this);
        }

        // Transitive closure over lookups, sealed hierarchies, and shared
        // outputs. The worklist grows a monotone set bounded by the file
        // count, so it always terminates.
        let mut worklist: Vec<PathBuf> = dirty.iter().cloned().collect();
        while let Some(file) = worklist.pop() {
            // Previous snapshot covers symbols the file stopped declaring;
            // the current parse covers symbols it just started declaring.
            let mut declared = self.symbols_map.get(&file).cloned().unwrap_or_default();
            if let Some(source) = by_path.get(file.as_path()) {
                declared.extend(source.declared_symbols(interner));
            }
            for key in &declared {
                let mut consumers = self
                    .symbol_lookups
                    .get(key)
                    .cloned()
                    .unwrap_or_default();
                if let Some(class_consumers) = self.class_lookups.get(key) {
                    consumers.extend(class_consumers.iter().cloned());
                }
                for consumer in consumers {
                    if current.contains(&consumer) && dirty.insert(consumer.clone()) {
                        self.log_dirty(sink, &consumer, "references symbol of dirty file");
                        worklist.push(consumer);
                    }
                }
            }

            let mut memberships = self.sealed_map.get(&file).cloned().unwrap_or_default();
            if let Some(source) = by_path.get(file.as_path()) {
                memberships.extend(source.sealed_memberships(interner));
            }
            for key in &memberships {
                let switchers = self.class_lookups.get(key).cloned().unwrap_or_default();
                for switcher in switchers {
                    if current.contains(&switcher) && dirty.insert(switcher.clone()) {
                        self.log_dirty(sink, &switcher, "sealed hierarchy membership changed");
                        worklist.push(switcher);
                    }
                }
            }

            // An output must be regenerated from all of its sources, so
            // co-generating sources of a dirty file's outputs are dirty too.
            let outputs = self
                .output_map
                .outputs_of_exactly(&file)
                .cloned()
                .unwrap_or_default();
            for output in &outputs {
                let co_sources = self.output_map.sources_of(output).cloned().unwrap_or_default();
                for source in co_sources {
                    if source == any_changes_path() {
                        continue;
                    }
                    if current.contains(&source) && dirty.insert(source.clone()) {
                        self.log_dirty(sink, &source, "co-generates output with dirty file");
                        worklist.push(source);
                    }
                }
            }
        }

        // Delete outputs of dirty sources so stale copies cannot survive.
        for file in &dirty {
            let outputs = self
                .output_map
                .outputs_of_exactly(file)
                .cloned()
                .unwrap_or_default();
            for output in outputs {
                self.delete_output(sink, &output);
            }
        }

        // Wildcard-associated outputs are stale on any new information —
        // additions count even without a text diff, since a new file may
        // match a previously unsatisfied reference.
        let any_new_information =
            !dirty.is_empty() || !self.removed.is_empty() || !added.is_empty();
        if any_new_information {
            for output in self.output_map.wildcard_outputs() {
                self.delete_output(sink, &output);
            }
        }

        self.log(
            sink,
            format!("{} of {} files dirty", dirty.len(), current.len()),
        );
        Ok(dirty)
    }

    /// Registers files generated during the round loop so their symbols and
    /// lookups are recorded at commit time.
    pub fn register_generated_files(&mut self, files: &[PathBuf]) {
        self.generated.extend(files.iter().cloned());
    }

    /// Commits the build's cache state: merges recorded lookups, replaces
    /// symbol and sealed maps for every processed file, installs the new
    /// source-to-output associations, refreshes the hash snapshot, and
    /// flushes every store to disk.
    ///
    /// Must only be called after a fully successful build; this is the single
    /// point at which anything reaches the cache directory.
    pub fn update_caches_and_outputs(
        &mut self,
        processed: &[&SourceFile],
        source_to_outputs: &BTreeMap<PathBuf, BTreeSet<PathBuf>>,
        interner: &Interner,
    ) -> Result<(), CacheError> {
        if !self.opts.incremental {
            return Ok(());
        }

        let mut compiled: BTreeSet<PathBuf> = processed.iter().map(|f| f.path.clone()).collect();
        compiled.extend(self.generated.iter().cloned());
        self.symbol_lookups
            .update(&self.symbol_tracker, &compiled, &self.removed);
        self.class_lookups
            .update(&self.class_tracker, &compiled, &self.removed);

        for file in processed {
            self.symbols_map
                .set(&file.path, file.declared_symbols(interner));
            self.sealed_map
                .set(&file.path, file.sealed_memberships(interner));
        }

        for (source, outputs) in source_to_outputs {
            self.output_map.replace_source(source, outputs.clone());
        }

        self.hashes.replace_all(self.current_hashes.clone());

        self.symbol_lookups.flush()?;
        self.class_lookups.flush()?;
        self.sealed_map.flush()?;
        self.symbols_map.flush()?;
        self.output_map.flush()?;
        self.hashes.flush()?;
        Ok(())
    }

    /// Renders the symbol-level lookups recorded this build. Debugging and
    /// testing only.
    pub fn dump_lookup_records(&self) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        for (key, files) in self.symbol_tracker.iter() {
            map.insert(
                key.to_string(),
                files.iter().map(|f| f.display().to_string()).collect(),
            );
        }
        map
    }

    fn delete_output(&mut self, sink: &DiagnosticSink, output: &Path) {
        let on_disk = self.opts.base_dir.join(output);
        if on_disk.exists() {
            // Best effort: a vanished output is already in the desired state.
            let _ = std::fs::remove_file(&on_disk);
            self.log(sink, format!("deleted stale output {}", output.display()));
        }
        self.output_map.remove_output(output);
    }

    fn log(&self, sink: &DiagnosticSink, message: impl Into<String>) {
        if self.opts.incremental_log {
            sink.emit(Diagnostic::info(message));
        }
    }

    fn log_dirty(&self, sink: &DiagnosticSink, file: &Path, reason: &str) {
        if self.opts.incremental_log {
            sink.emit(Diagnostic::info(format!("dirty: {reason}")).with_path(file));
        }
    }
}
