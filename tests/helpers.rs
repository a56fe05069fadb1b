//! Shared test utilities for connector-deb tests.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use connector_deb::config::{Config, Secret};
use connector_deb::metadata::HostPlatform;
use connector_deb::process::{Cmd, CommandResult, CommandRunner, ProcessError};
use connector_deb::progress::Progress;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const DEFAULT_CONTROL: &str = "Package: {{ name }}\nVersion: {{ version }}-1\nArchitecture: {{ architecture }}\nDescription: {{ description:none }}\n";

/// Test environment: a connector tree plus a tool directory with default
/// templates, both under one temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Connector root (package.json, deploy/)
    pub connector: PathBuf,
    /// Tool directory (templates/, key.gpg.enc)
    pub tool_dir: PathBuf,
}

impl TestEnv {
    /// A connector named `hello` at 1.0.0 with one executable binary.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let connector = temp_dir.path().join("connector");
        let tool_dir = temp_dir.path().join("tool");

        fs::create_dir_all(&connector).expect("Failed to create connector dir");
        fs::write(
            connector.join("package.json"),
            r#"{"name":"hello","version":"1.0.0","description":"Says hello","homepage":"https://example.com","license":"MIT"}"#,
        )
        .expect("Failed to write package.json");

        let env = Self {
            _temp_dir: temp_dir,
            connector,
            tool_dir,
        };
        env.write_default_template("DEBIAN/_control", DEFAULT_CONTROL);

        let bin = env.binaries();
        fs::create_dir_all(bin.join("lib")).expect("Failed to create bin dir");
        fs::write(bin.join("hello"), "#!/bin/sh\necho hello\n").expect("Failed to write binary");
        fs::set_permissions(bin.join("hello"), fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod binary");
        fs::write(bin.join("lib/addon.node"), [0u8, 1, 2, 3]).expect("Failed to write addon");

        env
    }

    /// Configuration for a linux/x64 host, unsigned.
    pub fn config(&self) -> Config {
        let mut config = Config::new(&self.connector, &self.tool_dir);
        config.host = HostPlatform::new("linux", "x64");
        config
    }

    /// Configuration with an encrypted key in place and both passwords set.
    pub fn signing_config(&self) -> Config {
        let mut config = self.config();
        fs::write(&config.signing.encrypted_key_path, "encrypted").expect("Failed to write key");
        config.signing.decryption_password = Some(Secret::new("decrypt-secret"));
        config.signing.signature_password = Some(Secret::new("sign-secret"));
        config
    }

    pub fn binaries(&self) -> PathBuf {
        self.connector.join("deploy/node8-linux-x64/bin")
    }

    pub fn installers(&self) -> PathBuf {
        self.connector.join("deploy/node8-linux-x64/installers")
    }

    pub fn staging(&self) -> PathBuf {
        self.installers().join("hello_1.0.0-1_amd64")
    }

    pub fn package(&self) -> PathBuf {
        self.installers().join("hello_1.0.0-1_amd64.deb")
    }

    pub fn write_default_template(&self, relative: &str, content: &str) {
        write_file(&self.tool_dir.join("templates").join(relative), content);
    }

    pub fn write_override_template(&self, relative: &str, content: &str) {
        write_file(
            &self
                .connector
                .join(".installer/debian/templates")
                .join(relative),
            content,
        );
    }
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("Failed to create dir");
    fs::write(path, content).expect("Failed to write file");
}

/// Records every command and fakes the external tools' side effects.
///
/// `dpkg --build <name>` snapshots the staging tree and writes
/// `<name>.deb`; `openssl` writes its `-out` file.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Cmd>>,
    failing: Vec<String>,
    staged: Mutex<Vec<PathBuf>>,
    staged_control: Mutex<Option<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` exit with code 1.
    pub fn failing(program: &str) -> Self {
        Self {
            failing: vec![program.to_string()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.program().to_string()).collect()
    }

    /// Relative paths present in the staging tree when `dpkg` ran.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }

    /// `DEBIAN/control` as it was when `dpkg` ran.
    pub fn staged_control(&self) -> Option<String> {
        self.staged_control.lock().unwrap().clone()
    }

    fn package(&self, cmd: &Cmd) {
        let dir = cmd.current_dir().expect("dpkg runs in the installers dir");
        let name = &cmd.arg_list()[1];
        let staging = dir.join(name);

        let files = WalkDir::new(&staging)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| e.path().strip_prefix(&staging).unwrap().to_path_buf())
            .collect();
        *self.staged.lock().unwrap() = files;
        *self.staged_control.lock().unwrap() =
            fs::read_to_string(staging.join("DEBIAN/control")).ok();

        fs::write(dir.join(format!("{}.deb", name)), "deb-archive").unwrap();
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult, ProcessError> {
        self.calls.lock().unwrap().push(cmd.clone());

        if self.failing.iter().any(|p| p == cmd.program()) {
            return Ok(CommandResult::failed(1, format!("{}: mock failure", cmd.program())));
        }

        match cmd.program() {
            "dpkg" => self.package(cmd),
            "openssl" => {
                let out = cmd.flag_value("-out").expect("openssl has -out");
                fs::write(out, "decrypted key").unwrap();
            }
            _ => {}
        }
        Ok(CommandResult::ok(""))
    }
}

/// Collects status lines.
#[derive(Default)]
pub struct RecordingProgress {
    pub lines: Vec<String>,
}

impl Progress for RecordingProgress {
    fn status(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file to exist: {}", path.display());
}

/// Assert that a file contains specific content.
pub fn assert_file_contains(path: &Path, content: &str) {
    let actual = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    assert!(
        actual.contains(content),
        "File {} does not contain '{}'. Actual content:\n{}",
        path.display(),
        content,
        actual
    );
}
