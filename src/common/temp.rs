//! Utilities for managing build work directories.

use std::fs;
use std::io;
use std::path::Path;

/// Prepare a work directory, removing it if it exists and creating it fresh.
///
/// A leftover tree from an aborted run would otherwise leak stale files
/// into the new package.
pub fn prepare_work_dir(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)
}

/// Remove a work directory. Missing directories are not an error.
pub fn cleanup_work_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
