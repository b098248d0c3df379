//! The `spindle plan` subcommand: compute and print the dirty set.

use std::error::Error;
use std::path::{Path, PathBuf};

use spindle_common::Interner;
use spindle_config::{load_config, resolve_paths};
use spindle_diagnostics::{DiagnosticSink, TextRenderer};
use spindle_incremental::{walk_source_roots, Changes, IncrementalContext, IncrementalOptions};
use spindle_symbols::SourceFile;

use crate::PlanArgs;

/// Computes the dirty set the next build would process and prints one line
/// per dirty file, followed by the incremental log explaining each decision.
///
/// The plan works from paths and the persisted caches alone, without parsing
/// declarations, so propagation uses the previous snapshot only. Nothing is
/// committed, but stale generated outputs are removed as part of the
/// computation, exactly as a build would remove them before regenerating.
pub fn run(args: &PlanArgs, project_dir: &str) -> Result<i32, Box<dyn Error>> {
    let project_dir = Path::new(project_dir);
    let config = load_config(project_dir)?;
    let paths = resolve_paths(&config, project_dir);

    let changes = if args.modified.is_empty() && args.removed.is_empty() {
        Changes::Detect
    } else {
        Changes::Known {
            modified: args.modified.iter().map(PathBuf::from).collect(),
            removed: args.removed.iter().map(PathBuf::from).collect(),
        }
    };

    let mut context = IncrementalContext::open(IncrementalOptions {
        incremental: config.incremental.enabled,
        intermodule: config.incremental.intermodule,
        incremental_log: true,
        base_dir: paths.base_dir.clone(),
        cache_dir: paths.cache_dir.clone(),
        changes,
        changed_classes: args.changed_classes.clone(),
    })?;

    let interner = Interner::new();
    let package = interner.get_or_intern("");
    let files: Vec<SourceFile> = walk_source_roots(
        &paths.base_dir,
        &paths.source_roots,
        &config.project.source_extensions,
    )
    .into_iter()
    .map(|path| SourceFile::new(path, package))
    .collect();

    let sink = DiagnosticSink::new();
    let dirty = context.calc_dirty_files(&files, &interner, &sink)?;

    for file in &dirty {
        println!("dirty: {}", file.display());
    }
    print!("{}", TextRenderer::render_all(&sink.diagnostics()));

    Ok(0)
}
