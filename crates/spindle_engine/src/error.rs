//! Error types for the engine.

use std::path::PathBuf;

use spindle_cache::CacheError;
use spindle_common::InternalError;

/// Errors that abort a build from within the engine itself.
///
/// These are distinct from processor errors, which are reported through the
/// diagnostic sink and terminate the build with a processing-error outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An output path was created twice within one build. Outputs must be
    /// uniquely attributable to the processor that created them.
    #[error("output file already exists: {path}")]
    FileAlreadyExists {
        /// The colliding output path.
        path: PathBuf,
    },

    /// An I/O error occurred while creating or deleting generated files.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persistent cache store failed to open, read, or flush.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A bug in the engine itself.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
