//! End-to-end test helpers for the Spindle engine.
//!
//! Provides a line-based micro-format for describing source files, a test
//! [`AnalysisHost`] that walks a project directory and parses that format,
//! a handful of scripted processors, and a `run_build` helper that drives
//! the round controller to completion and returns the observable results.
//!
//! The micro-format, one directive per line:
//!
//! ```text
//! package com.example
//! sealed class State
//! class Circle : com.example.State @Shape
//! fun area @Compute
//! val radius
//! ref com.example.Foo
//! classref com.example.State
//! ```

#![warn(missing_docs)]

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use spindle_common::{InternalError, Interner};
use spindle_diagnostics::{Diagnostic, Severity};
use spindle_engine::{
    AnalysisHost, BuildOutcome, EngineError, EngineOptions, OutputKind, Processor,
    ProcessorContext, ProcessorError, ProcessorProvider, RoundController,
};
use spindle_incremental::walk_source_roots;
use spindle_symbols::{
    ClassDecl, Declaration, FunctionDecl, LookupKey, PropertyDecl, Resolver, SourceFile, SymbolRef,
};

/// Parses a micro-format source into a [`SourceFile`].
pub fn parse_source(interner: &Interner, path: PathBuf, content: &str) -> SourceFile {
    let mut package = "main".to_string();
    let mut file = SourceFile::new(path, interner.get_or_intern(&package));

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["package", name] => {
                package = name.to_string();
                file.package = interner.get_or_intern(&package);
            }
            ["ref", fqn] => {
                file.symbol_references.push(split_fqn(fqn, &package));
            }
            ["classref", fqn] => {
                file.class_references.push(split_fqn(fqn, &package));
            }
            ["sealed", "class", name, rest @ ..] => {
                file.declarations
                    .push(parse_class(interner, name, true, rest, &package));
            }
            ["class", name, rest @ ..] => {
                file.declarations
                    .push(parse_class(interner, name, false, rest, &package));
            }
            ["fun", name, rest @ ..] => {
                file.declarations.push(Declaration::Function(FunctionDecl {
                    name: interner.get_or_intern(name),
                    annotations: parse_annotations(interner, rest),
                }));
            }
            ["val", name, rest @ ..] => {
                file.declarations.push(Declaration::Property(PropertyDecl {
                    name: interner.get_or_intern(name),
                    annotations: parse_annotations(interner, rest),
                }));
            }
            _ => panic!("unrecognized test source line: {line}"),
        }
    }
    file
}

fn parse_class(
    interner: &Interner,
    name: &str,
    is_sealed: bool,
    rest: &[&str],
    package: &str,
) -> Declaration {
    let mut super_types = Vec::new();
    let mut tokens = rest.iter();
    let mut annotations = Vec::new();
    while let Some(token) = tokens.next() {
        if *token == ":" {
            if let Some(fqn) = tokens.next() {
                super_types.push(split_fqn(fqn, package));
            }
        } else if let Some(annotation) = token.strip_prefix('@') {
            annotations.push(interner.get_or_intern(annotation));
        }
    }
    Declaration::Class(ClassDecl {
        name: interner.get_or_intern(name),
        is_sealed,
        super_types,
        annotations,
        members: Vec::new(),
    })
}

fn parse_annotations(interner: &Interner, tokens: &[&str]) -> Vec<spindle_common::Ident> {
    tokens
        .iter()
        .filter_map(|t| t.strip_prefix('@'))
        .map(|a| interner.get_or_intern(a))
        .collect()
}

fn split_fqn(fqn: &str, package: &str) -> LookupKey {
    match fqn.rsplit_once('.') {
        Some((scope, name)) => LookupKey::new(scope, name),
        None => LookupKey::new(package, fqn),
    }
}

/// A test analysis host that walks `<base>/src` plus any additional generated
/// roots and parses every source in the micro-format.
pub struct TestHost {
    base_dir: PathBuf,
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl TestHost {
    /// Creates a host over `<base_dir>/src`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            roots: vec![base_dir.join("src")],
            base_dir,
            extensions: vec!["kt".to_string(), "java".to_string()],
        }
    }
}

impl AnalysisHost for TestHost {
    fn analyze(
        &mut self,
        interner: &Interner,
        additional_roots: &[PathBuf],
    ) -> Result<Vec<SourceFile>, InternalError> {
        let mut roots = self.roots.clone();
        roots.extend(additional_roots.iter().map(|r| self.base_dir.join(r)));
        let files = walk_source_roots(&self.base_dir, &roots, &self.extensions);
        files
            .into_iter()
            .map(|rel| {
                let content = std::fs::read_to_string(self.base_dir.join(&rel))
                    .map_err(|e| InternalError::new(format!("read {}: {e}", rel.display())))?;
                Ok(parse_source(interner, rel, &content))
            })
            .collect()
    }
}

/// A provider that creates processors from a closure.
pub struct TestProvider<F>(pub F);

impl<F> ProcessorProvider for TestProvider<F>
where
    F: Fn() -> Box<dyn Processor>,
{
    fn create(
        &self,
        _options: &std::collections::BTreeMap<String, String>,
        _sink: &spindle_diagnostics::DiagnosticSink,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        Ok((self.0)())
    }
}

/// Boxes a closure into a processor provider.
pub fn provider(
    f: impl Fn() -> Box<dyn Processor> + 'static,
) -> Box<dyn ProcessorProvider> {
    Box::new(TestProvider(f))
}

/// Generates `<Name>Impl.kt` next to every declaration carrying the trigger
/// annotation, associated with the declaring file.
pub struct ImplGenerator {
    /// The annotation that triggers generation.
    pub annotation: String,
}

impl Processor for ImplGenerator {
    fn name(&self) -> &str {
        "impl-generator"
    }

    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        for symbol in resolver.symbols_with_annotation(&self.annotation) {
            let class_name = format!("{}Impl", symbol.key.name);
            let mut file = ctx
                .code_generator
                .create_file(OutputKind::Source, &symbol.key.scope, &class_name, "kt")
                .map_err(|e| ProcessorError::new(e.to_string()))?;
            writeln!(file, "package {}", symbol.key.scope)
                .map_err(|e| ProcessorError::new(e.to_string()))?;
            writeln!(file, "class {class_name}")
                .map_err(|e| ProcessorError::new(e.to_string()))?;
            ctx.code_generator.associate(
                &[symbol.file.clone()],
                OutputKind::Source,
                &symbol.key.scope,
                &class_name,
                "kt",
            );
        }
        Ok(Vec::new())
    }
}

/// An aggregating processor: generates one wildcard-associated registry file
/// per build, whenever anything is being processed.
pub struct RegistryGenerator {
    generated: bool,
}

impl RegistryGenerator {
    /// Creates a registry generator.
    pub fn new() -> Self {
        Self { generated: false }
    }
}

impl Default for RegistryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RegistryGenerator {
    fn name(&self) -> &str {
        "registry-generator"
    }

    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        if self.generated || resolver.new_files().is_empty() {
            return Ok(Vec::new());
        }
        let mut file = ctx
            .code_generator
            .create_file(OutputKind::Source, "registry", "Registry", "kt")
            .map_err(|e| ProcessorError::new(e.to_string()))?;
        writeln!(file, "package registry").map_err(|e| ProcessorError::new(e.to_string()))?;
        writeln!(file, "class Registry").map_err(|e| ProcessorError::new(e.to_string()))?;
        ctx.code_generator
            .associate_with_any_changes(OutputKind::Source, "registry", "Registry", "kt");
        self.generated = true;
        Ok(Vec::new())
    }
}

/// One step of a generation chain: seeing the trigger annotation on a new
/// symbol generates a class, optionally carrying the next trigger.
pub struct ChainRule {
    /// Annotation that triggers this rule.
    pub trigger: String,
    /// Package of the generated class.
    pub package: String,
    /// Name of the generated class.
    pub class_name: String,
    /// Annotation carried by the generated class, if any.
    pub annotation: Option<String>,
}

/// A processor that generates files according to a list of chain rules.
pub struct ChainGenerator {
    /// The rules applied every round.
    pub rules: Vec<ChainRule>,
}

impl Processor for ChainGenerator {
    fn name(&self) -> &str {
        "chain-generator"
    }

    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        for rule in &self.rules {
            for symbol in resolver.symbols_with_annotation(&rule.trigger) {
                // Only generate a class the resolver cannot already locate.
                let target = LookupKey::new(rule.package.as_str(), rule.class_name.as_str());
                if resolver.class_declaration(&target).is_some() {
                    continue;
                }
                let mut file = ctx
                    .code_generator
                    .create_file(OutputKind::Source, &rule.package, &rule.class_name, "kt")
                    .map_err(|e| ProcessorError::new(e.to_string()))?;
                let annotation = rule
                    .annotation
                    .as_ref()
                    .map(|a| format!(" @{a}"))
                    .unwrap_or_default();
                writeln!(file, "package {}", rule.package)
                    .map_err(|e| ProcessorError::new(e.to_string()))?;
                writeln!(file, "class {}{annotation}", rule.class_name)
                    .map_err(|e| ProcessorError::new(e.to_string()))?;
                ctx.code_generator.associate(
                    &[symbol.file.clone()],
                    OutputKind::Source,
                    &rule.package,
                    &rule.class_name,
                    "kt",
                );
            }
        }
        Ok(Vec::new())
    }
}

/// A processor that keeps deferring every symbol carrying the annotation, to
/// exercise the unresolved-deferred-symbols warning at termination.
pub struct DeferringProcessor {
    /// The annotation whose symbols are deferred forever.
    pub annotation: String,
}

impl Processor for DeferringProcessor {
    fn name(&self) -> &str {
        "deferring-processor"
    }

    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        let mut deferred = ctx.deferred.to_vec();
        deferred.extend(resolver.symbols_with_annotation(&self.annotation));
        Ok(deferred)
    }
}

/// A processor that always fails.
pub struct FailingProcessor {
    /// The failure message.
    pub message: String,
}

impl Processor for FailingProcessor {
    fn name(&self) -> &str {
        "failing-processor"
    }

    fn process(
        &mut self,
        _resolver: &Resolver<'_>,
        _ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        Err(ProcessorError::new(self.message.clone()))
    }
}

/// A shared log of processor lifecycle events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Creates an empty event log.
pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A processor that records its lifecycle into an [`EventLog`].
pub struct RecordingProcessor {
    /// The shared event log.
    pub log: EventLog,
}

impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        "recording-processor"
    }

    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        _ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError> {
        let new_files: Vec<String> = resolver
            .new_files()
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();
        self.log
            .lock()
            .unwrap()
            .push(format!("process:[{}]", new_files.join(",")));
        Ok(Vec::new())
    }

    fn on_error(&mut self) {
        self.log.lock().unwrap().push("on_error".to_string());
    }

    fn finish(&mut self) {
        self.log.lock().unwrap().push("finish".to_string());
    }
}

/// The observable results of a completed build.
pub struct BuildResult {
    /// The terminal outcome.
    pub outcome: BuildOutcome,
    /// How many rounds the build took.
    pub rounds: u32,
    /// All accumulated diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// The rendered diagnostic report.
    pub report: String,
}

impl BuildResult {
    /// Returns the project-relative paths the build judged dirty.
    pub fn dirty_files(&self) -> BTreeSet<PathBuf> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Info && d.message.starts_with("dirty:"))
            .filter_map(|d| d.path.clone())
            .collect()
    }
}

/// Runs one build to completion with the default options (incremental, with
/// the per-file incremental log enabled).
pub fn run_build(base_dir: &Path, providers: Vec<Box<dyn ProcessorProvider>>) -> BuildResult {
    run_build_with(base_dir, providers, |_| {})
}

/// Runs one build to completion after applying `configure` to the options.
pub fn run_build_with(
    base_dir: &Path,
    providers: Vec<Box<dyn ProcessorProvider>>,
    configure: impl FnOnce(&mut EngineOptions),
) -> BuildResult {
    try_run_build_with(base_dir, providers, configure).expect("engine error")
}

/// Like [`run_build_with`], but surfaces engine errors instead of panicking.
pub fn try_run_build_with(
    base_dir: &Path,
    providers: Vec<Box<dyn ProcessorProvider>>,
    configure: impl FnOnce(&mut EngineOptions),
) -> Result<BuildResult, EngineError> {
    let mut options = EngineOptions::new(base_dir);
    options.incremental_log = true;
    configure(&mut options);

    let mut controller = RoundController::new(options, providers);
    let mut host = TestHost::new(base_dir);
    let outcome = controller.run_to_completion(&mut host)?;
    Ok(BuildResult {
        outcome,
        rounds: controller.rounds(),
        diagnostics: controller.diagnostics(),
        report: controller.render_report(),
    })
}

/// Writes a source file under the project base directory.
pub fn write_source(base_dir: &Path, relative: &str, content: &str) {
    let path = base_dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_full_grammar() {
        let interner = Interner::new();
        let file = parse_source(
            &interner,
            PathBuf::from("src/A.kt"),
            "package com.example\n\
             sealed class State\n\
             class Circle : com.example.State @Shape\n\
             fun area @Compute\n\
             val radius\n\
             ref com.example.Foo\n\
             classref com.example.State\n",
        );
        assert_eq!(interner.resolve(file.package), "com.example");
        assert_eq!(file.declarations.len(), 4);
        assert_eq!(
            file.symbol_references,
            vec![LookupKey::new("com.example", "Foo")]
        );
        assert_eq!(
            file.class_references,
            vec![LookupKey::new("com.example", "State")]
        );

        let symbols = file.declared_symbols(&interner);
        assert!(symbols.contains(&LookupKey::new("com.example", "Circle")));

        let sealed = file.sealed_memberships(&interner);
        assert!(sealed.contains(&LookupKey::new("com.example", "State")));
    }

    #[test]
    fn parse_source_unqualified_super_uses_package() {
        let interner = Interner::new();
        let file = parse_source(
            &interner,
            PathBuf::from("src/B.kt"),
            "package app\nclass Square : Shape\n",
        );
        let sealed = file.sealed_memberships(&interner);
        assert!(sealed.contains(&LookupKey::new("app", "Shape")));
    }
}
