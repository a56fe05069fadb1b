//! `.deb` creation with `dpkg --build`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::BuildContext;
use crate::error::{BuildError, CommandFailure};
use crate::process::{Cmd, CommandRunner};
use crate::progress::Progress;

/// `dpkg --build <staging dir name>`, run from the staging tree's parent so
/// the archive lands next to it as `<name>.deb`.
pub fn package_command(installers: &Path, package_name: &str, timeout: Option<Duration>) -> Cmd {
    Cmd::new("dpkg")
        .args(["--build", package_name])
        .dir(installers)
        .timeout(timeout)
}

/// Build the archive from an assembled staging tree.
pub fn build_package(
    ctx: &BuildContext,
    runner: &dyn CommandRunner,
    progress: &mut dyn Progress,
) -> Result<PathBuf, BuildError> {
    progress.status("Building package");

    let cmd = package_command(
        &ctx.paths.installers,
        &ctx.metadata.package_name(),
        ctx.command_timeout,
    );
    let result = runner.run(&cmd)?;
    if !result.success() {
        return Err(BuildError::PackageBuild(CommandFailure::new(&cmd, result)));
    }

    let package = ctx.paths.package.clone();
    if !package.is_file() {
        let mut failure = CommandFailure::new(&cmd, result);
        failure.stderr = format!("expected archive was not produced: {}", package.display());
        return Err(BuildError::PackageBuild(failure));
    }

    Ok(package)
}
