//! Build orchestration: assemble, package, sign, clean up.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::Config;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::package;
use crate::process::CommandRunner;
use crate::progress::Progress;
use crate::sign::{SignOutcome, SigningPipeline};
use crate::stage::{self, StagingTree};
use crate::timing::Timer;

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub package: PathBuf,
    pub sha256: String,
    pub signing: SignOutcome,
}

/// Run a complete build for `config`.
///
/// Stages run strictly in order and the first failure is returned as is.
/// The staging tree is removed before returning on every path; the built
/// archive is never touched by cleanup.
pub fn run_build(
    config: &Config,
    runner: &dyn CommandRunner,
    progress: &mut dyn Progress,
) -> Result<BuildReport, BuildError> {
    let ctx = BuildContext::new(config)?;
    info!(
        package = %ctx.metadata.package_name(),
        target = %ctx.target,
        "building installer"
    );

    let staging = StagingTree::create(&ctx.paths.staging)?;
    let result = build_in(&ctx, &staging, runner, progress);
    drop(staging);
    result
}

fn build_in(
    ctx: &BuildContext,
    staging: &StagingTree,
    runner: &dyn CommandRunner,
    progress: &mut dyn Progress,
) -> Result<BuildReport, BuildError> {
    let timer = Timer::start("Staging");
    stage::assemble(ctx, staging, progress)?;
    progress.finished(timer);

    let timer = Timer::start("Building package");
    let package = package::build_package(ctx, runner, progress)?;
    progress.finished(timer);

    let timer = Timer::start("Signing");
    let signing = SigningPipeline::new(&ctx.signing, runner, ctx.command_timeout)
        .run(&package, progress)?;
    if signing == SignOutcome::Signed {
        progress.finished(timer);
    }

    let sha256 = sha256_file(&package).map_err(|source| BuildError::Archive {
        path: package.clone(),
        source,
    })?;

    Ok(BuildReport {
        package,
        sha256,
        signing,
    })
}

/// Hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
