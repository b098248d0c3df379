//! Path resolution: turning configured relative paths into usable ones.

use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// The fully resolved directory layout for one build invocation.
///
/// All paths are absolute, derived by joining the configured relative paths
/// onto the directory the config file was loaded from.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    /// The project base directory; source and output paths in the caches are
    /// recorded relative to it.
    pub base_dir: PathBuf,
    /// Directories walked for source files.
    pub source_roots: Vec<PathBuf>,
    /// Output directory for generated source files.
    pub sources_out: PathBuf,
    /// Output directory for generated resource files.
    pub resources_out: PathBuf,
    /// Output directory for generated class files.
    pub classes_out: PathBuf,
    /// Directory holding the persistent incremental caches.
    pub cache_dir: PathBuf,
}

/// Resolves the configured directory layout against the config directory.
///
/// Paths in `spindle.toml` are relative: `base_dir` is joined onto
/// `config_dir`, and everything else is joined onto the resulting base.
pub fn resolve_paths(config: &ProjectConfig, config_dir: &Path) -> ResolvedPaths {
    let base_dir = config_dir.join(&config.project.base_dir);
    ResolvedPaths {
        source_roots: config
            .project
            .source_roots
            .iter()
            .map(|r| base_dir.join(r))
            .collect(),
        sources_out: base_dir.join(&config.output.sources),
        resources_out: base_dir.join(&config.output.resources),
        classes_out: base_dir.join(&config.output.classes),
        cache_dir: base_dir.join(&config.output.cache),
        base_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn resolve_default_layout() {
        let config = load_config_from_str(
            "[project]\nname = \"app\"\nsource_roots = [\"src\"]\n",
        )
        .unwrap();
        let paths = resolve_paths(&config, Path::new("/proj"));
        assert_eq!(paths.base_dir, PathBuf::from("/proj/."));
        assert_eq!(paths.source_roots, vec![PathBuf::from("/proj/./src")]);
        assert_eq!(
            paths.cache_dir,
            PathBuf::from("/proj/./build/spindle-cache")
        );
    }

    #[test]
    fn resolve_custom_base_dir() {
        let config = load_config_from_str(
            "[project]\nname = \"app\"\nbase_dir = \"module\"\nsource_roots = [\"src\"]\n",
        )
        .unwrap();
        let paths = resolve_paths(&config, Path::new("/proj"));
        assert_eq!(paths.base_dir, PathBuf::from("/proj/module"));
        assert!(paths.sources_out.starts_with("/proj/module"));
    }
}
