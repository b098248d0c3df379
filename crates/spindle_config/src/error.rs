//! Error types for configuration loading and validation.

/// Errors that can occur while loading or validating `spindle.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("failed to parse spindle.toml: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ConfigError::ParseError("unexpected eof".to_string());
        assert!(err.to_string().contains("unexpected eof"));
    }

    #[test]
    fn missing_field_display() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert!(err.to_string().contains("project.name"));
    }
}
