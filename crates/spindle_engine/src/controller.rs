//! The round controller: drives repeated host analysis invocations until
//! code generation reaches a fixed point.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use spindle_common::{InternalError, Interner};
use spindle_diagnostics::{Diagnostic, DiagnosticSink, TextRenderer};
use spindle_incremental::{Changes, IncrementalContext, IncrementalOptions};
use spindle_symbols::{Resolver, SourceFile, SymbolRef};

use crate::codegen::CodeGenerator;
use crate::error::EngineError;
use crate::processor::{Processor, ProcessorContext, ProcessorProvider};

/// Soft ceiling on processing rounds. Exceeding it logs a warning so
/// accidentally infinite generation loops are visible, but never aborts:
/// legitimate multi-stage generation chains may need many rounds.
const MULTI_ROUND_THRESHOLD: u32 = 100;

/// The terminal result of a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// All rounds completed without errors; caches were committed.
    Success,
    /// A processor failed or reported an error diagnostic; caches were not
    /// committed.
    ProcessingError,
}

/// The controller's position in the round state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// Computing the dirty set and instantiating processors (first round only).
    Initializing,
    /// Invoking processors on the current new-file set.
    Processing,
    /// Collecting newly generated files.
    Generating,
    /// Deciding whether another round is needed.
    Deciding,
    /// The build has terminated.
    Done,
}

/// What the host should do after a round.
#[derive(Debug)]
pub enum RoundResult {
    /// Re-run the analysis phase with the additional roots included, then
    /// call [`RoundController::process_round`] again.
    Retry {
        /// Output directories (project-relative) to add to the analysis.
        additional_roots: Vec<PathBuf>,
    },
    /// The build is finished with the given outcome.
    Complete(BuildOutcome),
}

/// The host compiler's analysis phase, viewed from the engine.
///
/// Each invocation parses and resolves the current file set (source roots
/// plus any additional generated roots) and returns every source file with
/// its declarations and recorded references. Names are interned into the
/// engine-owned interner passed by reference; it is scoped to one build.
pub trait AnalysisHost {
    /// Analyzes the current file set.
    fn analyze(
        &mut self,
        interner: &Interner,
        additional_roots: &[PathBuf],
    ) -> Result<Vec<SourceFile>, InternalError>;
}

/// Options for one build invocation of the round controller.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// The project base directory (absolute).
    pub base_dir: PathBuf,
    /// Directory holding the persistent caches (absolute).
    pub cache_dir: PathBuf,
    /// Output directory for generated sources, relative to `base_dir`.
    pub sources_out: PathBuf,
    /// Output directory for generated resources, relative to `base_dir`.
    pub resources_out: PathBuf,
    /// Output directory for generated classes, relative to `base_dir`.
    pub classes_out: PathBuf,
    /// Master incremental switch.
    pub incremental: bool,
    /// Whether classpath changes translate into fine-grained lookups.
    pub intermodule: bool,
    /// Emit per-file dirty diagnostics.
    pub incremental_log: bool,
    /// Whether the host runs a final compilation pass over generated sources.
    pub with_compilation: bool,
    /// Extensions of generated files that trigger another round.
    pub source_extensions: Vec<String>,
    /// Free-form options passed to processors.
    pub processing_options: BTreeMap<String, String>,
    /// How changed files are determined.
    pub changes: Changes,
    /// Changed classpath class names.
    pub changed_classes: Vec<String>,
}

impl EngineOptions {
    /// Creates options with the default directory layout under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            cache_dir: base_dir.join("build/spindle-cache"),
            base_dir,
            sources_out: PathBuf::from("build/generated/sources"),
            resources_out: PathBuf::from("build/generated/resources"),
            classes_out: PathBuf::from("build/generated/classes"),
            incremental: true,
            intermodule: true,
            incremental_log: false,
            with_compilation: false,
            source_extensions: vec!["kt".to_string(), "java".to_string()],
            processing_options: BTreeMap::new(),
            changes: Changes::Detect,
            changed_classes: Vec::new(),
        }
    }
}

/// Drives the multi-round processing loop for one build.
///
/// State machine: Initializing → Processing → Generating → Deciding, looping
/// back to Processing while rounds keep generating source files, terminating
/// in Done. Caches are read once at Initializing and committed once at Done,
/// and only if no error occurred — a failed build leaves the on-disk caches
/// exactly as the previous successful build left them.
pub struct RoundController {
    options: EngineOptions,
    providers: Vec<Box<dyn ProcessorProvider>>,
    processors: Vec<Box<dyn Processor>>,
    deferred: Vec<Vec<SymbolRef>>,
    interner: Interner,
    sink: DiagnosticSink,
    incremental: Option<IncrementalContext>,
    codegen: Option<CodeGenerator>,
    state: RoundState,
    initialized: bool,
    finished: bool,
    rounds: u32,
    new_file_names: BTreeSet<PathBuf>,
    processed_files: BTreeSet<PathBuf>,
    outcome: BuildOutcome,
}

impl RoundController {
    /// Creates a controller for one build with the given processor providers.
    pub fn new(options: EngineOptions, providers: Vec<Box<dyn ProcessorProvider>>) -> Self {
        Self {
            options,
            providers,
            processors: Vec::new(),
            deferred: Vec::new(),
            interner: Interner::new(),
            sink: DiagnosticSink::new(),
            incremental: None,
            codegen: None,
            state: RoundState::Initializing,
            initialized: false,
            finished: false,
            rounds: 0,
            new_file_names: BTreeSet::new(),
            processed_files: BTreeSet::new(),
            outcome: BuildOutcome::Success,
        }
    }

    /// Runs rounds to completion, asking `host` to re-analyze between them.
    pub fn run_to_completion(
        &mut self,
        host: &mut dyn AnalysisHost,
    ) -> Result<BuildOutcome, EngineError> {
        let mut additional_roots = Vec::new();
        loop {
            let files = host
                .analyze(&self.interner, &additional_roots)
                .map_err(EngineError::Internal)?;
            match self.process_round(files)? {
                RoundResult::Retry {
                    additional_roots: roots,
                } => additional_roots = roots,
                RoundResult::Complete(outcome) => return Ok(outcome),
            }
        }
    }

    /// Processes one round over the host's current file set.
    ///
    /// The first call computes the dirty set and instantiates processors;
    /// later calls treat the files generated in the previous round as the
    /// new-file set.
    pub fn process_round(
        &mut self,
        mut files: Vec<SourceFile>,
    ) -> Result<RoundResult, EngineError> {
        if self.finished {
            // With a final compilation pass, the host re-enters once after
            // the terminal round; anything else is an engine bug.
            if self.options.with_compilation {
                return Ok(RoundResult::Complete(self.outcome));
            }
            return Err(InternalError::new("round loop re-entered after completion").into());
        }

        self.rounds += 1;
        if self.rounds > MULTI_ROUND_THRESHOLD {
            self.sink.emit(Diagnostic::warning(format!(
                "processing rounds exceeded {MULTI_ROUND_THRESHOLD}, \
                 check processors for potential infinite rounds"
            )));
        }

        if !self.initialized {
            self.state = RoundState::Initializing;
            let mut context = IncrementalContext::open(IncrementalOptions {
                incremental: self.options.incremental,
                intermodule: self.options.intermodule,
                incremental_log: self.options.incremental_log,
                base_dir: self.options.base_dir.clone(),
                cache_dir: self.options.cache_dir.clone(),
                changes: self.options.changes.clone(),
                changed_classes: self.options.changed_classes.clone(),
            })?;

            let dirty = context.calc_dirty_files(&files, &self.interner, &self.sink)?;
            self.new_file_names = dirty;
            self.incremental = Some(context);

            self.codegen = Some(CodeGenerator::new(
                &self.options.base_dir,
                &self.options.sources_out,
                &self.options.resources_out,
                &self.options.classes_out,
            ));

            for provider in &self.providers {
                match provider.create(&self.options.processing_options, &self.sink) {
                    Ok(processor) => {
                        self.processors.push(processor);
                        self.deferred.push(Vec::new());
                    }
                    Err(e) => self
                        .sink
                        .emit(Diagnostic::error(format!("failed to create processor: {e}"))),
                }
            }
            self.initialized = true;
        } else {
            let generated: Vec<PathBuf> = self.new_file_names.iter().cloned().collect();
            self.incremental_mut()?.register_generated_files(&generated);
        }

        for file in &mut files {
            file.is_new = self.new_file_names.contains(&file.path);
        }
        self.processed_files
            .extend(self.new_file_names.iter().cloned());

        // Record this round's resolution observations from the oracle.
        {
            let context = self.incremental_mut()?;
            for file in files.iter().filter(|f| f.is_new) {
                for key in &file.symbol_references {
                    context.symbol_tracker.record(&file.path, &key.scope, &key.name);
                }
                for key in &file.class_references {
                    context.class_tracker.record(&file.path, &key.scope, &key.name);
                }
            }
        }

        self.state = RoundState::Processing;
        // The symbol view spans the whole file set; restricting processor
        // work to new files is what keeps later rounds cheap.
        let all_files: Vec<&SourceFile> = files.iter().collect();
        let new_files: Vec<&SourceFile> = files.iter().filter(|f| f.is_new).collect();
        let resolver = Resolver::new(all_files, new_files, &self.interner);

        if !self.sink.has_errors() {
            let codegen = self
                .codegen
                .as_mut()
                .ok_or_else(|| InternalError::new("code generator not initialized"))?;
            for (index, processor) in self.processors.iter_mut().enumerate() {
                let previous_deferred = std::mem::take(&mut self.deferred[index]);
                let mut context = ProcessorContext {
                    options: &self.options.processing_options,
                    sink: &self.sink,
                    code_generator: &mut *codegen,
                    deferred: &previous_deferred,
                };
                match processor.process(&resolver, &mut context) {
                    Ok(deferred) => self.deferred[index] = deferred,
                    Err(e) => self.sink.emit(Diagnostic::error(format!(
                        "processor {}: {e}",
                        processor.name()
                    ))),
                }
            }
        }

        self.state = RoundState::Generating;
        let new_outputs = {
            let codegen = self
                .codegen
                .as_mut()
                .ok_or_else(|| InternalError::new("code generator not initialized"))?;
            let outputs = codegen.take_new_files();
            codegen.close_files();
            outputs
        };
        if new_outputs.is_empty() {
            // No new content: generation reached a fixed point.
            self.finished = true;
        }
        let new_sources: BTreeSet<PathBuf> = new_outputs
            .into_iter()
            .filter(|p| self.is_source_extension(p))
            .collect();
        self.new_file_names = new_sources;

        self.state = RoundState::Deciding;
        if self.sink.has_errors() {
            self.finished = true;
            self.outcome = BuildOutcome::ProcessingError;
            for processor in &mut self.processors {
                processor.on_error();
            }
        } else if self.finished {
            for (index, processor) in self.processors.iter().enumerate() {
                if !self.deferred[index].is_empty() {
                    let symbols: Vec<String> =
                        self.deferred[index].iter().map(|s| s.to_string()).collect();
                    self.sink.emit(Diagnostic::warning(format!(
                        "unable to process: {}: {}",
                        processor.name(),
                        symbols.join("; ")
                    )));
                }
            }
            for processor in &mut self.processors {
                processor.finish();
            }
            if !self.sink.has_errors() {
                let processed: Vec<&SourceFile> = files
                    .iter()
                    .filter(|f| self.processed_files.contains(&f.path))
                    .collect();
                let source_to_outputs = self
                    .codegen
                    .as_ref()
                    .map(CodeGenerator::source_to_outputs)
                    .unwrap_or_default();
                let interner = &self.interner;
                if let Some(context) = self.incremental.as_mut() {
                    context.update_caches_and_outputs(&processed, &source_to_outputs, interner)?;
                }
            }
        }

        if self.finished {
            self.state = RoundState::Done;
            if !self.options.with_compilation {
                return Ok(RoundResult::Complete(self.outcome));
            }
        }
        Ok(RoundResult::Retry {
            additional_roots: vec![self.options.sources_out.clone()],
        })
    }

    /// Renders all accumulated diagnostics. Called once, after the terminal
    /// round; intermediate rounds never print.
    pub fn render_report(&self) -> String {
        TextRenderer::render_all(&self.sink.diagnostics())
    }

    /// Returns the accumulated diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.diagnostics()
    }

    /// Returns the controller's position in the round state machine.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Returns the number of rounds run so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    fn is_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.options.source_extensions.iter().any(|x| x == e))
            .unwrap_or(false)
    }

    fn incremental_mut(&mut self) -> Result<&mut IncrementalContext, EngineError> {
        match self.incremental.as_mut() {
            Some(context) => Ok(context),
            None => Err(InternalError::new("incremental context not initialized").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyHost;

    impl AnalysisHost for EmptyHost {
        fn analyze(
            &mut self,
            _interner: &Interner,
            _additional_roots: &[PathBuf],
        ) -> Result<Vec<SourceFile>, InternalError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_project_completes_in_one_round() {
        let dir = tempfile::tempdir().unwrap();
        let options = EngineOptions::new(dir.path());
        let mut controller = RoundController::new(options, Vec::new());
        let outcome = controller.run_to_completion(&mut EmptyHost).unwrap();
        assert_eq!(outcome, BuildOutcome::Success);
        assert_eq!(controller.rounds(), 1);
        assert_eq!(controller.state(), RoundState::Done);
    }

    #[test]
    fn reentry_after_completion_is_an_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = EngineOptions::new(dir.path());
        let mut controller = RoundController::new(options, Vec::new());
        controller.run_to_completion(&mut EmptyHost).unwrap();

        let result = controller.process_round(Vec::new());
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }

    #[test]
    fn with_compilation_signals_one_extra_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = EngineOptions::new(dir.path());
        options.with_compilation = true;
        let mut controller = RoundController::new(options, Vec::new());

        // Terminal round still asks the host to recompile with the
        // generated roots included.
        let result = controller.process_round(Vec::new()).unwrap();
        assert!(matches!(result, RoundResult::Retry { .. }));

        // The re-entry resolves to the terminal outcome.
        let result = controller.process_round(Vec::new()).unwrap();
        assert!(matches!(
            result,
            RoundResult::Complete(BuildOutcome::Success)
        ));
    }

    #[test]
    fn default_options_layout() {
        let options = EngineOptions::new("/proj");
        assert_eq!(options.base_dir, PathBuf::from("/proj"));
        assert_eq!(options.cache_dir, PathBuf::from("/proj/build/spindle-cache"));
        assert!(options.incremental);
        assert_eq!(options.source_extensions, vec!["kt", "java"]);
    }
}
