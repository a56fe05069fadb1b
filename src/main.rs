//! connector-deb - Debian installer builder for prebuilt connectors.
//!
//! Turns a connector's `deploy/<target>/bin` directory into a
//! `<name>_<version>-1_<arch>.deb`, optionally signed with a GPG key that is
//! stored encrypted next to the tool.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use connector_deb::config::{Config, Secret};

#[derive(Parser)]
#[command(name = "connector-deb")]
#[command(about = "Debian installer builder for prebuilt connectors")]
#[command(
    after_help = "QUICK START:\n  connector-deb preflight     Check host tools and connector layout\n  connector-deb build         Build (and sign) the .deb\n  connector-deb show config   Show resolved configuration\n  connector-deb clean         Remove leftover staging trees"
)]
struct Cli {
    #[command(flatten)]
    options: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the installer package for the connector
    Build,

    /// Run preflight checks (verify host tools and connector layout)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Remove leftover staging trees
    Clean {
        /// Also remove built packages
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

#[derive(Args)]
struct ConfigArgs {
    /// Connector root holding package.json and deploy/
    #[arg(long, env = "CONNECTOR_PATH", default_value = ".", global = true)]
    connector_path: PathBuf,

    /// Install path inside the package (default: usr/share/<name>/connectors/<name>)
    #[arg(long, env = "CONNECTOR_DESTINATION_PATH", global = true)]
    destination_path: Option<String>,

    /// Encrypted GPG signing key; signing is skipped when the file is absent
    #[arg(long, env = "CONNECTOR_ENCRYPTED_GPG_KEY_PATH", global = true)]
    encrypted_gpg_key_path: Option<PathBuf>,

    /// Key id passed to the signer
    #[arg(long, env = "CONNECTOR_GPG_KEY_ID", global = true)]
    gpg_key_id: Option<String>,

    /// Passphrase of the imported signing key
    #[arg(long, env = "CONNECTOR_CERT_PASSWORD", hide_env_values = true, global = true)]
    cert_password: Option<String>,

    /// Password the signing key was encrypted with
    #[arg(long, env = "CONNECTOR_ENCRYPTION_PASSWORD", hide_env_values = true, global = true)]
    encryption_password: Option<String>,

    /// Default template root (default: templates/ next to the tool)
    #[arg(long, env = "CONNECTOR_DEB_TEMPLATES", global = true)]
    template_root: Option<PathBuf>,

    /// Host architecture in runtime naming (x64, ia32, arm, arm64)
    #[arg(long, env = "CONNECTOR_DEB_HOST_ARCH", global = true)]
    arch: Option<String>,

    /// Node major version the binaries were built for
    #[arg(long, env = "CONNECTOR_DEB_NODE_VERSION", global = true)]
    node_version: Option<String>,

    /// Cipher the signing key was encrypted with
    #[arg(long, env = "CONNECTOR_DEB_CIPHER", global = true)]
    cipher: Option<String>,

    /// Timeout in seconds for each external tool (0 disables)
    #[arg(long, env = "CONNECTOR_DEB_COMMAND_TIMEOUT", global = true)]
    command_timeout: Option<u64>,
}

impl ConfigArgs {
    fn into_config(self, tool_dir: &Path) -> Result<Config> {
        let connector_path = std::path::absolute(&self.connector_path)?;
        let mut config = Config::new(connector_path, tool_dir);

        config.destination_path = self.destination_path.filter(|p| !p.is_empty());
        if let Some(root) = self.template_root {
            config.template_root = root;
        }
        if let Some(arch) = self.arch {
            config.host = config.host.with_arch(arch);
        }
        if let Some(version) = self.node_version {
            config.node_version = version;
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(path) = self.encrypted_gpg_key_path {
            config.signing.encrypted_key_path = path;
        }
        if let Some(cipher) = self.cipher {
            config.signing.cipher = cipher;
        }
        config.signing.key_id = self.gpg_key_id.filter(|id| !id.is_empty());
        config.signing.signature_password = self.cert_password.map(Secret::new);
        config.signing.decryption_password = self.encryption_password.map(Secret::new);

        Ok(config)
    }
}

fn main() -> Result<()> {
    // Load .env if present, before clap reads the environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tool_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let config = cli.options.into_config(&tool_dir)?;

    match cli.command {
        Commands::Build => {
            commands::cmd_build(&config)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }

        Commands::Clean { all } => {
            let clean_target = if all {
                commands::clean::CleanTarget::All
            } else {
                commands::clean::CleanTarget::Staging
            };
            commands::cmd_clean(clean_target, &config)?;
        }
    }

    Ok(())
}
