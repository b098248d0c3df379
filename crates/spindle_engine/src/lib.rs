//! The multi-round symbol-processing engine.
//!
//! The round controller drives repeated invocations of the host analysis
//! phase, feeding processors progressively smaller "new file" sets until
//! generation reaches a fixed point: the dirty set on round one, freshly
//! generated source files on later rounds, done when a round generates
//! nothing. Caches are committed only when the whole build succeeds.

#![warn(missing_docs)]

mod codegen;
mod controller;
mod error;
mod processor;

pub use codegen::{CodeGenerator, OutputKind};
pub use controller::{
    AnalysisHost, BuildOutcome, EngineOptions, RoundController, RoundResult, RoundState,
};
pub use error::EngineError;
pub use processor::{Processor, ProcessorContext, ProcessorError, ProcessorProvider};
