//! Per-build context threaded through every stage.
//!
//! Everything a stage needs is computed once here from the [`Config`] and
//! the connector descriptor, so no stage relies on ambient state and two
//! builds for different packages never share paths.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, SigningConfig};
use crate::error::BuildError;
use crate::metadata::PackageMetadata;

/// Filesystem layout of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub connector: PathBuf,
    /// `<connector>/deploy/<target>`
    pub deploy: PathBuf,
    /// Prebuilt binaries, `<deploy>/bin`.
    pub binaries: PathBuf,
    /// Where the staging tree and the archive are written.
    pub installers: PathBuf,
    /// `<installers>/<package name>`
    pub staging: PathBuf,
    /// `<installers>/<package name>.deb`
    pub package: PathBuf,
    pub override_templates: PathBuf,
    pub default_templates: PathBuf,
    /// Binary install location, relative to the staging root.
    pub install_path: PathBuf,
}

impl BuildPaths {
    pub fn new(config: &Config, metadata: &PackageMetadata, target: &str) -> Self {
        let deploy = config.connector_path.join("deploy").join(target);
        let installers = deploy.join("installers");
        let package_name = metadata.package_name();
        let install_path = config
            .destination_path
            .clone()
            .unwrap_or_else(|| metadata.default_install_path());

        Self {
            connector: config.connector_path.clone(),
            binaries: deploy.join("bin"),
            staging: installers.join(&package_name),
            package: installers.join(format!("{}.deb", package_name)),
            installers,
            deploy,
            override_templates: config.override_template_root(),
            default_templates: config.template_root.clone(),
            install_path: package_relative(Path::new(&install_path)),
        }
    }
}

/// Drop root and `..` components so an absolute or sloppy destination still
/// lands inside the staging tree.
fn package_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct BuildContext {
    pub metadata: PackageMetadata,
    pub target: String,
    pub paths: BuildPaths,
    pub signing: SigningConfig,
    pub command_timeout: Option<Duration>,
}

impl BuildContext {
    /// Read the descriptor and lay out the build.
    pub fn new(config: &Config) -> Result<Self, BuildError> {
        let metadata = PackageMetadata::load(&config.connector_path, &config.host)?;
        Ok(Self::with_metadata(config, metadata))
    }

    pub fn with_metadata(config: &Config, metadata: PackageMetadata) -> Self {
        let target = config.host.target(&config.node_version);
        let paths = BuildPaths::new(config, &metadata, &target);
        Self {
            metadata,
            target,
            paths,
            signing: config.signing.clone(),
            command_timeout: config.command_timeout,
        }
    }
}
