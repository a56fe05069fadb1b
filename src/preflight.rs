//! Preflight checks for a connector build.
//!
//! Validates host tools and the connector layout before starting a build.
//! Run with `connector-deb preflight` to check everything is ready.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::context::BuildContext;
use crate::process;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - build will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
#[derive(Debug)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if all checks passed (no failures).
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn find(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let (icon, status_str) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
                CheckStatus::Warn => ("⚠", "WARN"),
            };

            print!("  {} [{}] {}", icon, status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        let total = self.checks.len();
        let passed = self.count(CheckStatus::Pass);
        println!("Summary: {}/{} passed", passed, total);
        if self.fail_count() > 0 {
            println!("         {} FAILED - build will not succeed", self.fail_count());
        }
        if self.warn_count() > 0 {
            println!("         {} warnings", self.warn_count());
        }
    }
}

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let signing_enabled = config.signing.encrypted_key_path.exists();

    let mut checks = check_host_tools(signing_enabled);
    checks.extend(check_connector(config));
    checks.extend(check_signing(config, signing_enabled));

    PreflightReport { checks }
}

/// Run preflight checks and fail if any check fails.
pub fn run_preflight_or_fail(config: &Config) -> Result<()> {
    let report = run_preflight(config);
    report.print();
    if !report.all_passed() {
        bail!("Preflight failed: {} check(s) failed", report.fail_count());
    }
    Ok(())
}

/// Packaging tools are always required; signing tools only when a key is
/// configured.
fn check_host_tools(signing_enabled: bool) -> Vec<CheckResult> {
    let mut results = vec![check_tool_exists(
        "dpkg",
        "dpkg",
        "Required to build the package",
        true,
    )];

    let signing_tools = [
        ("openssl", "openssl", "Required to decrypt the signing key"),
        ("gpg", "gnupg", "Required to import the signing key"),
        ("dpkg-sig", "dpkg-sig", "Required to sign the package"),
    ];
    for (tool, package, purpose) in signing_tools {
        results.push(check_tool_exists(tool, package, purpose, signing_enabled));
    }

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

fn check_connector(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let ctx = match BuildContext::new(config) {
        Ok(ctx) => {
            results.push(CheckResult::pass_with(
                "Descriptor",
                &ctx.metadata.package_name(),
            ));
            ctx
        }
        Err(e) => {
            results.push(CheckResult::fail("Descriptor", &e.to_string()));
            return results;
        }
    };

    if ctx.metadata.architecture == crate::metadata::UNSUPPORTED_ARCH {
        results.push(CheckResult::warn(
            "Architecture",
            &format!("Host arch '{}' has no Debian mapping", config.host.arch),
        ));
    } else {
        results.push(CheckResult::pass_with("Architecture", &ctx.metadata.architecture));
    }

    if ctx.paths.binaries.is_dir() {
        results.push(CheckResult::pass_with(
            "Binaries",
            &ctx.paths.binaries.display().to_string(),
        ));
    } else {
        results.push(CheckResult::fail(
            "Binaries",
            &format!("Not found at {}", ctx.paths.binaries.display()),
        ));
    }

    if ctx.paths.default_templates.is_dir() {
        results.push(CheckResult::pass("Default templates"));
    } else {
        results.push(CheckResult::fail(
            "Default templates",
            &format!("Not found at {}", ctx.paths.default_templates.display()),
        ));
    }

    if ctx.paths.override_templates.is_dir() {
        results.push(CheckResult::pass_with(
            "Template overrides",
            &ctx.paths.override_templates.display().to_string(),
        ));
    } else {
        results.push(CheckResult::pass_with("Template overrides", "none"));
    }

    results
}

fn check_signing(config: &Config, signing_enabled: bool) -> Vec<CheckResult> {
    let key = &config.signing.encrypted_key_path;
    if !signing_enabled {
        return vec![CheckResult::warn(
            "Signing key",
            &format!("Not found at {} - package will be unsigned", key.display()),
        )];
    }

    let mut results = vec![CheckResult::pass_with("Signing key", &key.display().to_string())];
    if config.signing.decryption_password.is_none() {
        results.push(CheckResult::fail(
            "Encryption password",
            "Signing key present but no encryption password configured",
        ));
    } else {
        results.push(CheckResult::pass("Encryption password"));
    }
    results
}
