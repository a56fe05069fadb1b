//! Removal of build leftovers for a connector.

use anyhow::{Context, Result};
use std::fs;

use crate::context::BuildContext;

/// Remove staging trees left behind by interrupted builds. Built archives
/// are kept.
pub fn clean_staging(ctx: &BuildContext) -> Result<usize> {
    let installers = &ctx.paths.installers;
    if !installers.is_dir() {
        println!("No installers directory to clean.");
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(installers)
        .with_context(|| format!("Failed to read {}", installers.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            println!("Removing {}...", path.display());
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }

    if removed == 0 {
        println!("No staging trees to clean.");
    } else {
        println!("Staging trees cleaned.");
    }
    Ok(removed)
}

/// Remove the whole installers directory, built packages included.
pub fn clean_installers(ctx: &BuildContext) -> Result<()> {
    let installers = &ctx.paths.installers;
    if installers.exists() {
        println!("Removing {}...", installers.display());
        fs::remove_dir_all(installers)
            .with_context(|| format!("Failed to remove {}", installers.display()))?;
        println!("Installers cleaned.");
    } else {
        println!("No installers to clean.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metadata::{HostPlatform, PackageMetadata};
    use std::path::Path;
    use tempfile::TempDir;

    fn context(root: &Path) -> BuildContext {
        let mut config = Config::new(root.join("connector"), &root.join("tool"));
        config.host = HostPlatform::new("linux", "x64");
        let metadata = PackageMetadata::parse(
            Path::new("package.json"),
            r#"{"name":"hello","version":"1.0.0"}"#,
            &config.host,
        )
        .unwrap();
        BuildContext::with_metadata(&config, metadata)
    }

    #[test]
    fn test_clean_staging_keeps_archives() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        fs::create_dir_all(ctx.paths.staging.join("DEBIAN")).unwrap();
        fs::write(&ctx.paths.package, "deb").unwrap();

        assert_eq!(clean_staging(&ctx).unwrap(), 1);

        assert!(!ctx.paths.staging.exists());
        assert!(ctx.paths.package.exists());
    }

    #[test]
    fn test_clean_installers_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        fs::create_dir_all(&ctx.paths.staging).unwrap();
        fs::write(&ctx.paths.package, "deb").unwrap();

        clean_installers(&ctx).unwrap();

        assert!(!ctx.paths.installers.exists());
    }

    #[test]
    fn test_clean_nothing_there() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        assert_eq!(clean_staging(&ctx).unwrap(), 0);
        clean_installers(&ctx).unwrap();
    }
}
