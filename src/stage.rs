//! Staging tree assembly.
//!
//! The staging tree mirrors the installed filesystem plus `DEBIAN/`. It is
//! owned by exactly one build and removed when the [`StagingTree`] guard is
//! dropped, whichever way the build ends.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::common::{cleanup_work_dir, copy_file_with_dirs, prepare_work_dir};
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::progress::Progress;
use crate::template;

/// Exclusive handle on the on-disk staging directory.
#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
}

impl StagingTree {
    /// Create the directory fresh, discarding leftovers from earlier runs.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, BuildError> {
        let root = root.into();
        prepare_work_dir(&root).map_err(|source| BuildError::Staging {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for StagingTree {
    fn drop(&mut self) {
        match cleanup_work_dir(&self.root) {
            Ok(()) => debug!(path = %self.root.display(), "staging tree removed"),
            Err(e) => warn!(
                path = %self.root.display(),
                error = %e,
                "failed to remove staging tree"
            ),
        }
    }
}

/// Populate the staging tree: templates first, then the prebuilt binaries.
pub fn assemble(
    ctx: &BuildContext,
    staging: &StagingTree,
    progress: &mut dyn Progress,
) -> Result<(), BuildError> {
    progress.status("Processing templates");
    let templates = template::resolve(&ctx.paths.override_templates, &ctx.paths.default_templates)?;
    let written = template::render_all(&templates, &ctx.metadata, staging.root())?;
    debug!(files = written.len(), "templates staged");

    progress.status("Copying pkg assets");
    let destination = staging.root().join(&ctx.paths.install_path);
    let copied = copy_tree(&ctx.paths.binaries, &destination)?;
    debug!(files = copied, destination = %destination.display(), "binaries staged");

    Ok(())
}

/// Recursively copy `from` into `to`, keeping modes and symlinks.
///
/// Fails with [`BuildError::MissingArtifact`] when `from` is not a
/// directory, so an empty package is never produced. Returns the number of
/// non-directory entries copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize, BuildError> {
    if !from.is_dir() {
        return Err(BuildError::MissingArtifact(from.to_path_buf()));
    }

    let mut copied = 0;
    for item in WalkDir::new(from).sort_by_file_name() {
        let item = item.map_err(|e| BuildError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e.into(),
        })?;
        let relative = item.path().strip_prefix(from).unwrap_or(Path::new(""));
        let target = to.join(relative);
        let copy_err = |source: io::Error| BuildError::Copy {
            from: item.path().to_path_buf(),
            to: target.clone(),
            source,
        };

        let file_type = item.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_err)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(item.path()).map_err(copy_err)?;
            if fs::symlink_metadata(&target).is_ok() {
                fs::remove_file(&target).map_err(copy_err)?;
            }
            symlink(&link, &target).map_err(copy_err)?;
            copied += 1;
        } else {
            copy_file_with_dirs(item.path(), &target).map_err(copy_err)?;
            copied += 1;
        }
    }

    Ok(copied)
}
