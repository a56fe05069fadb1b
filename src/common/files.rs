//! File writes and copies with automatic parent directory creation.

use std::fs;
use std::io;
use std::path::Path;

/// Write a file, creating parent directories as needed.
///
/// An existing file at `path` is replaced rather than written through, so a
/// read-only leftover or a symlink from a previous run does not get in the
/// way.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> io::Result<()> {
    let path = path.as_ref();
    prepare_destination(path)?;
    fs::write(path, content)
}

/// Copy a file byte for byte (permissions included), creating parent
/// directories and replacing any existing file.
pub fn copy_file_with_dirs(from: &Path, to: &Path) -> io::Result<()> {
    prepare_destination(to)?;
    fs::copy(from, to)?;
    Ok(())
}

fn prepare_destination(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path),
        _ => Ok(()),
    }
}
