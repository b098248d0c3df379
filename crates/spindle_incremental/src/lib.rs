//! Incremental dirty-set computation.
//!
//! Given the previous build's caches, the current file set, and the changes
//! since the last build (supplied by the host or derived by content hashing),
//! this crate computes the transitive closure of files that must be
//! reprocessed, and maintains the caches when a build completes successfully.
//!
//! Change detection is content-hash based: a whitespace-only edit changes the
//! file's hash and marks it dirty. This is deliberate — a byte-identical file
//! is provably unchanged, while anything subtler would require a semantic
//! diff against a parse of the previous revision.

#![warn(missing_docs)]

mod context;
mod hasher;
mod roots;

pub use context::{Changes, IncrementalContext, IncrementalOptions};
pub use hasher::{ChangeSet, SourceHasher};
pub use roots::walk_source_roots;
