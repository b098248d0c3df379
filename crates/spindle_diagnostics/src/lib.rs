//! Diagnostic reporting for the Spindle symbol-processing engine.
//!
//! Diagnostics emitted by the engine and by processors are accumulated in a
//! [`DiagnosticSink`] during the round loop and rendered exactly once, at the
//! terminal round of a build. Intermediate rounds never print, so users never
//! see duplicate or premature messages from rounds that are later retried.

#![warn(missing_docs)]

mod diagnostic;
mod renderer;
mod severity;
mod sink;

pub use diagnostic::Diagnostic;
pub use renderer::TextRenderer;
pub use severity::Severity;
pub use sink::DiagnosticSink;
