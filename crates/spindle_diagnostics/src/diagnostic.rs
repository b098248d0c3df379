//! Structured diagnostic messages with severity and an optional file path.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A diagnostic message emitted by the engine or by a processor.
///
/// Spindle diagnostics are file-granular: the engine reasons about whole
/// files (dirty or clean, generated or stale), so a diagnostic optionally
/// names a file rather than a source span.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The main diagnostic message.
    pub message: String,
    /// The file this diagnostic refers to, if any.
    pub path: Option<PathBuf>,
}

impl Diagnostic {
    /// Creates a new error diagnostic with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new warning diagnostic with the given message.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new informational diagnostic with the given message.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            path: None,
        }
    }

    /// Attaches a file path to this diagnostic.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructor() {
        let d = Diagnostic::error("processor failed");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "processor failed");
        assert!(d.path.is_none());
    }

    #[test]
    fn with_path() {
        let d = Diagnostic::info("dirty").with_path("src/A.kt");
        assert_eq!(d.path, Some(PathBuf::from("src/A.kt")));
    }

    #[test]
    fn serde_roundtrip() {
        let d = Diagnostic::warning("unable to process").with_path("src/B.kt");
        let json = serde_json::to_string(&d).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.severity, Severity::Warning);
        assert_eq!(back.message, "unable to process");
        assert_eq!(back.path, Some(PathBuf::from("src/B.kt")));
    }
}
