//! Show command - displays information.

use anyhow::Result;

use connector_deb::config::Config;
use connector_deb::context::BuildContext;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
            println!();
            match BuildContext::new(config) {
                Ok(ctx) => {
                    println!("Package: {}", ctx.metadata.package_name());
                    println!("  Binaries: {}", ctx.paths.binaries.display());
                    println!("  Install path: /{}", ctx.paths.install_path.display());
                    println!("  Output: {}", ctx.paths.package.display());
                }
                Err(e) => println!("Package: unavailable ({})", e),
            }
        }
    }
    Ok(())
}
