//! Build command - builds the installer package.

use anyhow::Result;

use connector_deb::config::Config;
use connector_deb::orchestrator;
use connector_deb::process::SystemRunner;
use connector_deb::progress::ConsoleProgress;
use connector_deb::sign::SignOutcome;
use connector_deb::timing::{format_elapsed, Timer};

/// Execute the build command.
///
/// A failed build is reported as one line naming the phase and ends the
/// process with exit code 1.
pub fn cmd_build(config: &Config) -> Result<()> {
    let timer = Timer::start("Build");
    let mut progress = ConsoleProgress;

    match orchestrator::run_build(config, &SystemRunner, &mut progress) {
        Ok(report) => {
            println!("\nShip it!");
            println!("  Package: {}", report.package.display());
            println!("  SHA-256: {}", report.sha256);
            if report.signing == SignOutcome::Skipped {
                println!("  Signature: none (no signing key found)");
            }
            println!("  Took {}", format_elapsed(timer.elapsed()));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.failure_line());
            std::process::exit(1);
        }
    }
}
