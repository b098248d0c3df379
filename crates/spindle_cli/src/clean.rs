//! The `spindle clean` subcommand: drop the incremental caches.

use std::error::Error;
use std::path::Path;

use spindle_config::{load_config, resolve_paths};

/// Removes the cache directory. The next build will reprocess everything.
pub fn run(project_dir: &str) -> Result<i32, Box<dyn Error>> {
    let project_dir = Path::new(project_dir);
    let config = load_config(project_dir)?;
    let paths = resolve_paths(&config, project_dir);

    match std::fs::remove_dir_all(&paths.cache_dir) {
        Ok(()) => {
            println!("removed {}", paths.cache_dir.display());
            Ok(0)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
