//! Persistent incremental-processing caches.
//!
//! The cache directory holds independent sub-stores, each a single binary
//! file with a validated header: two lookup storages (symbol-level and
//! class-level), two file-to-symbols maps (sealed hierarchy membership and
//! all declared symbols), the source-to-output map, and the content-hash
//! snapshot used for change detection.
//!
//! Stores are read once at build start and written once at successful build
//! completion. A failed build drops its stores unflushed, leaving the
//! on-disk state exactly as the previous successful build left it. Unlike a
//! build-artifact cache, corruption here is a hard error: a damaged store
//! cannot be treated as a miss, because dirty sets computed from partial
//! lookup data would silently skip required regeneration.

#![warn(missing_docs)]

mod error;
mod hash_map;
mod lookup;
mod output_map;
mod store;
mod symbols_map;

pub use error::CacheError;
pub use hash_map::FileHashMap;
pub use lookup::LookupStorage;
pub use output_map::{any_changes_path, OutputMap, ANY_CHANGES_NAME};
pub use symbols_map::FileSymbolsMap;
