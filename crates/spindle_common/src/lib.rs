//! Shared foundational types used across the Spindle symbol-processing engine.
//!
//! This crate provides core types including interned identifiers, content
//! hashing for change detection, and the common result type for internal
//! engine errors.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{InternalError, SpindleResult};
