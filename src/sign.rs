//! Package signing: decrypt the key, import it, sign the archive.
//!
//! The pipeline is a short linear state machine. Decrypted key material
//! lives in a private temporary directory owned by [`DecryptedKey`], so it
//! is deleted as soon as signing finishes or any later step fails.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::debug;

use crate::config::SigningConfig;
use crate::error::{BuildError, CommandFailure};
use crate::process::{Cmd, CommandRunner};
use crate::progress::Progress;

/// Environment variable carrying the decryption password to `openssl`.
pub const PASSWORD_ENV: &str = "CONNECTOR_DEB_KEY_PASSWORD";

const DECRYPTED_KEY_FILE: &str = "signing-key.gpg";
const PASSPHRASE_FILE: &str = "passphrase";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    /// No key configured; the package stays unsigned.
    Skipped,
    Signed,
}

/// Decrypted key (and passphrase file) on disk; removed on drop.
#[derive(Debug)]
pub struct DecryptedKey {
    dir: TempDir,
    key_path: PathBuf,
}

impl DecryptedKey {
    fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("connector-deb-key-")
            .tempdir()?;
        let key_path = dir.path().join(DECRYPTED_KEY_FILE);
        Ok(Self { dir, key_path })
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn write_passphrase(&self, passphrase: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(PASSPHRASE_FILE);
        fs::write(&path, passphrase)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        Ok(path)
    }
}

enum SignState {
    CheckKey,
    Decrypt,
    Import(DecryptedKey),
    Sign(DecryptedKey),
    Done(SignOutcome),
}

pub struct SigningPipeline<'a> {
    config: &'a SigningConfig,
    runner: &'a dyn CommandRunner,
    timeout: Option<Duration>,
}

impl<'a> SigningPipeline<'a> {
    pub fn new(
        config: &'a SigningConfig,
        runner: &'a dyn CommandRunner,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            config,
            runner,
            timeout,
        }
    }

    /// Sign `package` if a key is configured.
    pub fn run(
        &self,
        package: &Path,
        progress: &mut dyn Progress,
    ) -> Result<SignOutcome, BuildError> {
        let mut state = SignState::CheckKey;
        loop {
            state = match state {
                SignState::CheckKey => {
                    if self.config.encrypted_key_path.exists() {
                        SignState::Decrypt
                    } else {
                        progress.status(&format!(
                            "[SKIP] No signing key at {}, package left unsigned",
                            self.config.encrypted_key_path.display()
                        ));
                        SignState::Done(SignOutcome::Skipped)
                    }
                }
                SignState::Decrypt => {
                    progress.status("Decrypting signing key");
                    SignState::Import(self.decrypt()?)
                }
                SignState::Import(key) => {
                    progress.status("Importing signing key");
                    self.import(&key)?;
                    SignState::Sign(key)
                }
                SignState::Sign(key) => {
                    progress.status("Signing package");
                    self.sign(package, &key)?;
                    SignState::Done(SignOutcome::Signed)
                }
                SignState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    fn decrypt(&self) -> Result<DecryptedKey, BuildError> {
        let password = self.config.decryption_password.as_ref().ok_or_else(|| {
            BuildError::SigningConfig(format!(
                "{} exists but no encryption password is configured",
                self.config.encrypted_key_path.display()
            ))
        })?;
        let key = DecryptedKey::new().map_err(|e| {
            BuildError::SigningConfig(format!("cannot create temporary key directory: {}", e))
        })?;

        let cmd = self
            .decrypt_command(key.key_path())
            .env(PASSWORD_ENV, password.expose());
        let result = self.runner.run(&cmd)?;
        if !result.success() {
            return Err(BuildError::Decrypt(CommandFailure::new(&cmd, result)));
        }
        debug!(path = %key.key_path().display(), "signing key decrypted");
        Ok(key)
    }

    fn import(&self, key: &DecryptedKey) -> Result<(), BuildError> {
        let cmd = self.import_command(key.key_path());
        let result = self.runner.run(&cmd)?;
        if !result.success() {
            return Err(BuildError::Import(CommandFailure::new(&cmd, result)));
        }
        Ok(())
    }

    fn sign(&self, package: &Path, key: &DecryptedKey) -> Result<(), BuildError> {
        let passphrase_file = match &self.config.signature_password {
            Some(password) => {
                let path = key.write_passphrase(password.expose()).map_err(|e| {
                    BuildError::SigningConfig(format!("cannot write passphrase file: {}", e))
                })?;
                check_gpg_option_path(&path)?;
                Some(path)
            }
            None => None,
        };

        let cmd = self.sign_command(package, passphrase_file.as_deref());
        let result = self.runner.run(&cmd)?;
        if !result.success() {
            return Err(BuildError::Sign(CommandFailure::new(&cmd, result)));
        }
        Ok(())
    }

    /// `openssl <cipher> -d`; the password is read from [`PASSWORD_ENV`] so
    /// it never appears in the process list.
    pub fn decrypt_command(&self, output: &Path) -> Cmd {
        Cmd::new("openssl")
            .args([self.config.cipher.as_str(), "-d", "-in"])
            .arg_path(&self.config.encrypted_key_path)
            .arg("-out")
            .arg_path(output)
            .arg("-pass")
            .arg(format!("env:{}", PASSWORD_ENV))
            .timeout(self.timeout)
    }

    pub fn import_command(&self, key: &Path) -> Cmd {
        Cmd::new("gpg")
            .args(["--batch", "--yes", "--import"])
            .arg_path(key)
            .timeout(self.timeout)
    }

    /// `dpkg-sig --sign builder`, with gpg forced into batch mode so it
    /// never prompts.
    pub fn sign_command(&self, package: &Path, passphrase_file: Option<&Path>) -> Cmd {
        let mut gpg_options = String::from("--batch --yes");
        if let Some(file) = passphrase_file {
            gpg_options.push_str(" --pinentry-mode loopback --passphrase-file ");
            gpg_options.push_str(&file.to_string_lossy());
        }

        let mut cmd = Cmd::new("dpkg-sig").args(["--sign", "builder"]);
        if let Some(key_id) = &self.config.key_id {
            cmd = cmd.args(["-k", key_id.as_str()]);
        }
        cmd.args(["-g", gpg_options.as_str()])
            .arg_path(package)
            .timeout(self.timeout)
    }
}

/// `dpkg-sig -g` splits its option string on whitespace, so a path embedded
/// in it must not contain any.
fn check_gpg_option_path(path: &Path) -> Result<(), BuildError> {
    if path.to_string_lossy().chars().any(char::is_whitespace) {
        return Err(BuildError::SigningConfig(format!(
            "passphrase file path contains whitespace: {} \
             (set TMPDIR to a path without spaces)",
            path.display()
        )));
    }
    Ok(())
}
