//! The processor plugin interface.

use std::collections::BTreeMap;

use spindle_diagnostics::DiagnosticSink;
use spindle_symbols::{Resolver, SymbolRef};

use crate::codegen::CodeGenerator;

/// An error reported by a processor.
///
/// A processor returning `Err` terminates the build with a processing-error
/// outcome: `on_error` is invoked on every processor, `finish` is never
/// invoked, and the caches are not committed.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProcessorError {
    /// Description of what went wrong.
    pub message: String,
}

impl ProcessorError {
    /// Creates a new processor error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-invocation context handed to a processor alongside the resolver.
///
/// Gives the processor its option map, the shared diagnostic sink, the code
/// generator for creating output files, and the symbols it deferred in the
/// previous round.
pub struct ProcessorContext<'a> {
    /// Free-form options from the project configuration.
    pub options: &'a BTreeMap<String, String>,
    /// The shared diagnostic sink. Emitting an error-severity diagnostic
    /// terminates the build with a processing-error outcome after the
    /// current round.
    pub sink: &'a DiagnosticSink,
    /// The code generator used to create output files.
    pub code_generator: &'a mut CodeGenerator,
    /// Symbols this processor deferred in the previous round and asked to
    /// revisit. Empty on the first round.
    pub deferred: &'a [SymbolRef],
}

/// A symbol processor: the third-party plugin invoked once per round.
///
/// Processors read the symbol view through the resolver, generate files
/// through the code generator, and may return symbols they could not yet
/// handle; those are fed back through
/// [`ProcessorContext::deferred`] the next round.
pub trait Processor {
    /// A stable human-readable name, used in diagnostics.
    fn name(&self) -> &str;

    /// Processes the current round's new files.
    ///
    /// Returns the symbols still of interest — declarations this processor
    /// wants to revisit in a later round because something they depend on is
    /// not yet resolvable. Returning an empty vector means the processor is
    /// done unless new files appear.
    fn process(
        &mut self,
        resolver: &Resolver<'_>,
        ctx: &mut ProcessorContext<'_>,
    ) -> Result<Vec<SymbolRef>, ProcessorError>;

    /// Called exactly once, after any round in which an error occurred, on
    /// every processor. The build terminates afterwards without committing
    /// caches.
    fn on_error(&mut self) {}

    /// Called exactly once when the build terminates without errors.
    fn finish(&mut self) {}
}

/// Creates processor instances at the start of a build.
pub trait ProcessorProvider {
    /// Instantiates the processor. A returned error aborts the build with a
    /// processing-error outcome.
    fn create(
        &self,
        options: &BTreeMap<String, String>,
        sink: &DiagnosticSink,
    ) -> Result<Box<dyn Processor>, ProcessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_error_display() {
        let err = ProcessorError::new("schema not found");
        assert_eq!(err.to_string(), "schema not found");
    }
}
