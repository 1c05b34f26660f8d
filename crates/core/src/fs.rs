//! Filesystem utilities

use std::path::Path;

use log::warn;

/// Check if a path exists
pub fn path_exists(path: &str) -> bool {
    Path::new(path).exists()
}

/// Check if a path is a directory, logging a warning when it is not
///
/// The service only reads from its data directory, so a missing directory
/// is reported rather than created.
pub fn is_directory(path: &str) -> bool {
    let is_dir = Path::new(path).is_dir();
    if !is_dir {
        warn!("Not a directory: {}", path);
    }
    is_dir
}
