//! Common result and error types for the Spindle engine.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value (which may be partial or degraded after
/// error recovery). `Err` indicates an unrecoverable internal error (a bug
/// in Spindle), not a user-facing error. Processor and user errors are
/// reported through the diagnostic sink and the operation still returns `Ok`.
pub type SpindleResult<T> = Result<T, InternalError>;

/// An internal engine error indicating a bug in Spindle, not a user input
/// problem or a misbehaving processor.
///
/// These errors should never occur during normal operation, and are surfaced
/// to callers as a build result distinct from processor errors to aid triage.
#[derive(Debug, thiserror::Error)]
#[error("internal engine error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
