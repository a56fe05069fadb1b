//! Package metadata derived from the connector descriptor and the host.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;

/// Descriptor file at the connector root.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Runtime major version baked into the deploy target string.
pub const DEFAULT_NODE_VERSION: &str = "8";

/// Debian revision appended to every package version.
pub const DEBIAN_REVISION: &str = "1";

/// Architecture token used when the host CPU has no Debian mapping.
pub const UNSUPPORTED_ARCH: &str = "unsupported";

#[derive(Debug, Deserialize)]
struct Descriptor {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    license: Option<License>,
}

/// `license` is a plain SPDX string, or the legacy `{ "type": ... }` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum License {
    Spdx(String),
    Legacy {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl License {
    fn into_string(self) -> String {
        match self {
            Self::Spdx(s) => s,
            Self::Legacy { kind } => kind,
        }
    }
}

/// Map a runtime architecture name to the Debian architecture token.
///
/// This is a pass-through mapping, not a validation gate: anything unknown
/// becomes `unsupported` and packaging is left to fail downstream.
pub fn debian_arch(host_arch: &str) -> &'static str {
    match host_arch {
        "ia32" => "i386",
        "x64" => "amd64",
        "arm" => "armhf",
        _ => UNSUPPORTED_ARCH,
    }
}

/// Host platform and CPU, using the runtime naming the deploy directories
/// are keyed on (`linux`/`darwin`/`win32`, `x64`/`ia32`/`arm`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub platform: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(platform: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform this process runs on.
    pub fn detect() -> Self {
        Self::new(
            runtime_platform(std::env::consts::OS),
            runtime_arch(std::env::consts::ARCH),
        )
    }

    /// Replace the detected CPU, for packaging on behalf of another arch.
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn debian_arch(&self) -> &'static str {
        debian_arch(&self.arch)
    }

    /// Deploy target directory name, e.g. `node8-linux-x64`.
    pub fn target(&self, node_version: &str) -> String {
        let platform = match self.platform.as_str() {
            "darwin" => "macos",
            "win32" => "win",
            other => other,
        };
        let arch = match self.arch.as_str() {
            "ia32" => "x86",
            "arm" => "armv7",
            other => other,
        };
        format!("node{}-{}-{}", node_version, platform, arch)
    }
}

fn runtime_platform(os: &str) -> String {
    match os {
        "macos" => "darwin".to_string(),
        "windows" => "win32".to_string(),
        other => other.to_string(),
    }
}

fn runtime_arch(arch: &str) -> String {
    match arch {
        "x86" => "ia32".to_string(),
        "x86_64" => "x64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// Immutable metadata record used to name the package and fill templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub architecture: String,
}

impl PackageMetadata {
    /// Read `package.json` from the connector root.
    pub fn load(connector_path: &Path, host: &HostPlatform) -> Result<Self, BuildError> {
        let path = connector_path.join(DESCRIPTOR_FILE);
        let text = fs::read_to_string(&path).map_err(|e| BuildError::Descriptor {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&path, &text, host)
    }

    /// Parse descriptor JSON; `path` is only used for error messages.
    pub fn parse(path: &Path, text: &str, host: &HostPlatform) -> Result<Self, BuildError> {
        let invalid = |reason: String| BuildError::Descriptor {
            path: path.to_path_buf(),
            reason,
        };

        let descriptor: Descriptor =
            serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;

        let name = descriptor
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| invalid("missing \"name\"".to_string()))?;
        let version = descriptor
            .version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| invalid("missing \"version\"".to_string()))?;

        Ok(Self {
            name,
            version,
            description: descriptor.description.unwrap_or_default(),
            homepage: descriptor.homepage.unwrap_or_default(),
            license: descriptor
                .license
                .map(License::into_string)
                .unwrap_or_default(),
            architecture: host.debian_arch().to_string(),
        })
    }

    /// Look up a template field by name. `type` and `arch` are accepted as
    /// aliases of `name` and `architecture`.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "name" | "type" => &self.name,
            "version" => &self.version,
            "description" => &self.description,
            "homepage" => &self.homepage,
            "license" => &self.license,
            "architecture" | "arch" => &self.architecture,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// `{name}_{version}-1_{arch}`, used for the staging tree and the archive.
    pub fn package_name(&self) -> String {
        format!(
            "{}_{}-{}_{}",
            self.name, self.version, DEBIAN_REVISION, self.architecture
        )
    }

    /// Where the binaries land inside the package unless overridden.
    pub fn default_install_path(&self) -> String {
        format!("usr/share/{0}/connectors/{0}", self.name)
    }
}
