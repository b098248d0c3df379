//! Project configuration for the Spindle symbol-processing engine.
//!
//! Configuration is read from a `spindle.toml` file in the project directory.
//! It names the source roots to walk, the output directories for generated
//! sources, resources and classes, the cache directory, the incremental
//! processing flags, and the free-form option map handed to processors.

#![warn(missing_docs)]

mod error;
mod loader;
mod resolve;
mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::{resolve_paths, ResolvedPaths};
pub use types::{
    BuildConfig, IncrementalConfig, OutputConfig, ProjectConfig, ProjectMeta,
};
