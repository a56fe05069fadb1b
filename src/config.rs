//! Build configuration.
//!
//! The CLI layer (flags, environment variables and `.env`) resolves every
//! value before the build starts; the core only ever sees a finished
//! [`Config`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metadata::{HostPlatform, DEFAULT_NODE_VERSION};
use crate::template::{DEFAULT_TEMPLATE_DIR, OVERRIDE_TEMPLATE_DIR};

/// Symmetric cipher the signing key was encrypted with.
pub const DEFAULT_CIPHER: &str = "aes-256-cbc";

/// Encrypted key looked up next to the tool when none is configured.
pub const DEFAULT_KEY_FILE: &str = "key.gpg.enc";

/// Upper bound for any single external tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// A password that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything the signing pipeline needs.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Signing is skipped when this file does not exist.
    pub encrypted_key_path: PathBuf,
    /// Key to sign with; the signer's default key when unset.
    pub key_id: Option<String>,
    /// Unlocks the imported key while signing.
    pub signature_password: Option<Secret>,
    /// Decrypts `encrypted_key_path`.
    pub decryption_password: Option<Secret>,
    pub cipher: String,
}

impl SigningConfig {
    pub fn new(encrypted_key_path: PathBuf) -> Self {
        Self {
            encrypted_key_path,
            key_id: None,
            signature_password: None,
            decryption_password: None,
            cipher: DEFAULT_CIPHER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Connector root holding `package.json` and `deploy/`.
    pub connector_path: PathBuf,
    /// Install path inside the package; derived from the connector name
    /// when unset.
    pub destination_path: Option<String>,
    /// Bundled default templates.
    pub template_root: PathBuf,
    pub host: HostPlatform,
    pub node_version: String,
    pub signing: SigningConfig,
    /// `None` disables the timeout.
    pub command_timeout: Option<Duration>,
}

impl Config {
    /// Defaults for a connector, with bundled resources under `tool_dir`.
    pub fn new(connector_path: impl Into<PathBuf>, tool_dir: &Path) -> Self {
        Self {
            connector_path: connector_path.into(),
            destination_path: None,
            template_root: tool_dir.join(DEFAULT_TEMPLATE_DIR),
            host: HostPlatform::detect(),
            node_version: DEFAULT_NODE_VERSION.to_string(),
            signing: SigningConfig::new(tool_dir.join(DEFAULT_KEY_FILE)),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }

    /// Connector-supplied template overrides.
    pub fn override_template_root(&self) -> PathBuf {
        self.connector_path.join(OVERRIDE_TEMPLATE_DIR)
    }

    /// Print configuration for debugging. Passwords are only reported as
    /// set or unset.
    pub fn print(&self) {
        let set = |s: &Option<Secret>| if s.is_some() { "(set)" } else { "(unset)" };

        println!("Configuration:");
        println!("  CONNECTOR_PATH: {}", self.connector_path.display());
        println!(
            "  CONNECTOR_DESTINATION_PATH: {}",
            self.destination_path.as_deref().unwrap_or("(derived from name)")
        );
        println!("  CONNECTOR_DEB_TEMPLATES: {}", self.template_root.display());
        println!("  Override templates: {}", self.override_template_root().display());
        println!(
            "  CONNECTOR_DEB_HOST_ARCH: {} (deb: {})",
            self.host.arch,
            self.host.debian_arch()
        );
        println!("  Target: {}", self.host.target(&self.node_version));
        println!(
            "  CONNECTOR_ENCRYPTED_GPG_KEY_PATH: {}",
            self.signing.encrypted_key_path.display()
        );
        println!(
            "  CONNECTOR_GPG_KEY_ID: {}",
            self.signing.key_id.as_deref().unwrap_or("(signer default)")
        );
        println!("  CONNECTOR_CERT_PASSWORD: {}", set(&self.signing.signature_password));
        println!("  CONNECTOR_ENCRYPTION_PASSWORD: {}", set(&self.signing.decryption_password));
        println!("  CONNECTOR_DEB_CIPHER: {}", self.signing.cipher);
        match self.command_timeout {
            Some(t) => println!("  CONNECTOR_DEB_COMMAND_TIMEOUT: {}s", t.as_secs()),
            None => println!("  CONNECTOR_DEB_COMMAND_TIMEOUT: disabled"),
        }
        if self.signing.encrypted_key_path.exists() {
            println!("  Signing key: FOUND");
        } else {
            println!("  Signing key: NOT FOUND (package will be unsigned)");
        }
    }
}
