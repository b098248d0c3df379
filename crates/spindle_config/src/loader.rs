//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Loads and validates a `spindle.toml` configuration from a project directory.
///
/// Reads `<project_dir>/spindle.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join("spindle.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `spindle.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.source_roots.is_empty() {
        return Err(ConfigError::MissingField("project.source_roots".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "app"
source_roots = ["src/main"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "app");
        assert_eq!(config.project.source_roots, vec!["src/main"]);
        assert_eq!(config.project.base_dir, ".");
        assert_eq!(config.project.source_extensions, vec!["kt", "java"]);
        assert!(config.incremental.enabled);
        assert!(!config.build.with_compilation);
        assert!(config.options.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "app"
base_dir = "module"
source_roots = ["src/main", "src/extra"]
source_extensions = ["kt"]

[output]
sources = "out/src"
resources = "out/res"
classes = "out/classes"
cache = "out/cache"

[incremental]
enabled = true
intermodule = false
log = true

[build]
with_compilation = true

[options]
verbose = "true"
room.schemaLocation = "schemas"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.base_dir, "module");
        assert_eq!(config.project.source_roots.len(), 2);
        assert_eq!(config.project.source_extensions, vec!["kt"]);
        assert_eq!(config.output.sources, "out/src");
        assert_eq!(config.output.cache, "out/cache");
        assert!(!config.incremental.intermodule);
        assert!(config.incremental.log);
        assert!(config.build.with_compilation);
        assert_eq!(config.options["verbose"], "true");
        assert_eq!(config.options["room.schemaLocation"], "schemas");
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
source_roots = ["src"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_source_roots_errors() {
        let toml = r#"
[project]
name = "app"
source_roots = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let toml = "this is not valid toml {{{}}}";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("spindle.toml"),
            "[project]\nname = \"app\"\nsource_roots = [\"src\"]\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "app");
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
