//! Clean command - removes build leftovers.

use anyhow::Result;

use connector_deb::clean;
use connector_deb::config::Config;
use connector_deb::context::BuildContext;

/// Clean target for the clean command.
pub enum CleanTarget {
    /// Staging trees only (default)
    Staging,
    /// Staging trees and built packages
    All,
}

/// Execute the clean command.
pub fn cmd_clean(target: CleanTarget, config: &Config) -> Result<()> {
    let ctx = BuildContext::new(config)?;
    match target {
        CleanTarget::Staging => {
            clean::clean_staging(&ctx)?;
        }
        CleanTarget::All => {
            clean::clean_installers(&ctx)?;
        }
    }
    Ok(())
}
