//! Build failure taxonomy.
//!
//! Every stage returns [`BuildError`]. None of them are retried; the first
//! one aborts the build and is reported to the operator as a single line
//! naming the failed phase.

use std::error::Error as _;
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::{Cmd, CommandResult, ProcessError};

/// Captured output of an external tool that exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub program: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandFailure {
    pub fn new(cmd: &Cmd, result: CommandResult) -> Self {
        Self {
            program: cmd.program().to_string(),
            code: result.code,
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "'{}' exited with code {}", self.program, code)?,
            None => write!(f, "'{}' was terminated by a signal", self.program)?,
        }
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            write!(f, ":\n{}", stderr)?;
        } else if !stdout.is_empty() {
            write!(f, ":\n{}", stdout)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot read connector descriptor {}: {reason}", .path.display())]
    Descriptor { path: PathBuf, reason: String },

    #[error("template discovery failed for {}: {reason}", .root.display())]
    Discovery { root: PathBuf, reason: String },

    #[error("cannot render {} to {}", .source_path.display(), .destination.display())]
    Render {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source path does not exist: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("cannot copy {} to {}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot prepare staging tree {}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("package build failed: {0}")]
    PackageBuild(CommandFailure),

    #[error("cannot read built package {}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("signing is misconfigured: {0}")]
    SigningConfig(String),

    #[error("signing key decryption failed: {0}")]
    Decrypt(CommandFailure),

    #[error("signing key import failed: {0}")]
    Import(CommandFailure),

    #[error("package signing failed: {0}")]
    Sign(CommandFailure),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl BuildError {
    /// Short name of the build phase this error belongs to.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Descriptor { .. } => "descriptor",
            Self::Discovery { .. } | Self::Render { .. } => "templates",
            Self::MissingArtifact(_) | Self::Copy { .. } => "assets",
            Self::Staging { .. } => "staging",
            Self::PackageBuild(_) | Self::Archive { .. } => "package",
            Self::SigningConfig(_) | Self::Decrypt(_) => "decrypt",
            Self::Import(_) => "import",
            Self::Sign(_) => "sign",
            Self::Process(_) => "process",
        }
    }

    /// The single line reported to the operator: failed phase, message, and
    /// every underlying cause.
    pub fn failure_line(&self) -> String {
        let mut line = format!("Build failed during {}: {}", self.phase(), self);
        let mut cause = self.source();
        while let Some(err) = cause {
            line.push_str(": ");
            line.push_str(&err.to_string());
            cause = err.source();
        }
        line
    }

    /// Captured tool output, when the failure came from an external tool.
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::PackageBuild(f) | Self::Decrypt(f) | Self::Import(f) | Self::Sign(f) => Some(f),
            _ => None,
        }
    }
}
