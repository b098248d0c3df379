//! Configuration types deserialized from `spindle.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `spindle.toml`.
///
/// Contains project metadata, output directory layout, incremental processing
/// flags, build integration flags, and the free-form processing option map
/// handed to every processor.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, source roots, source extensions).
    pub project: ProjectMeta,
    /// Output directory layout for generated files and the cache.
    #[serde(default)]
    pub output: OutputConfig,
    /// Incremental processing flags.
    #[serde(default)]
    pub incremental: IncrementalConfig,
    /// Host compilation integration flags.
    #[serde(default)]
    pub build: BuildConfig,
    /// Free-form options passed through to processors.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Core project metadata required in every `spindle.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project base directory, relative to the config file. All source
    /// and output paths are recorded relative to this directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    /// Directories to walk for source files, relative to `base_dir`.
    pub source_roots: Vec<String>,
    /// File extensions considered compilable sources. Generated files with
    /// one of these extensions trigger another processing round; any other
    /// extension is a resource.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_source_extensions() -> Vec<String> {
    vec!["kt".to_string(), "java".to_string()]
}

/// Output directory layout, relative to the project base directory.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated source files.
    #[serde(default = "default_sources_out")]
    pub sources: String,
    /// Directory for generated resource files.
    #[serde(default = "default_resources_out")]
    pub resources: String,
    /// Directory for generated class files.
    #[serde(default = "default_classes_out")]
    pub classes: String,
    /// Directory holding the persistent incremental caches.
    #[serde(default = "default_cache_dir")]
    pub cache: String,
}

fn default_sources_out() -> String {
    "build/generated/sources".to_string()
}

fn default_resources_out() -> String {
    "build/generated/resources".to_string()
}

fn default_classes_out() -> String {
    "build/generated/classes".to_string()
}

fn default_cache_dir() -> String {
    "build/spindle-cache".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sources: default_sources_out(),
            resources: default_resources_out(),
            classes: default_classes_out(),
            cache: default_cache_dir(),
        }
    }
}

/// Incremental processing flags.
#[derive(Debug, Deserialize)]
pub struct IncrementalConfig {
    /// Master switch. When `false`, the dirty-set computation is skipped and
    /// every file is reprocessed. This is the explicit escape hatch for a
    /// corrupt cache directory.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether classpath changes are translated into fine-grained lookups.
    /// When `false`, any classpath change marks all files dirty.
    #[serde(default = "default_true")]
    pub intermodule: bool,
    /// Emit one diagnostic line per dirty file naming the reason. Used by
    /// callers and tests to assert exact incremental behavior.
    #[serde(default)]
    pub log: bool,
}

fn default_true() -> bool {
    true
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intermodule: true,
            log: false,
        }
    }
}

/// Host compilation integration flags.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// When `true`, the host runs a final compilation pass over the generated
    /// sources; the round loop signals one extra retry with the generated
    /// roots instead of terminating directly.
    #[serde(default)]
    pub with_compilation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults() {
        let out = OutputConfig::default();
        assert_eq!(out.sources, "build/generated/sources");
        assert_eq!(out.cache, "build/spindle-cache");
    }

    #[test]
    fn incremental_defaults() {
        let inc = IncrementalConfig::default();
        assert!(inc.enabled);
        assert!(inc.intermodule);
        assert!(!inc.log);
    }
}
