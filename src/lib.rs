//! connector-deb library exports.
//!
//! The binary is a thin CLI over [`orchestrator::run_build`]; everything it
//! drives is exposed here so the build can be exercised from integration
//! tests with a mock [`process::CommandRunner`].

pub mod clean;
pub mod common;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod package;
pub mod preflight;
pub mod process;
pub mod progress;
pub mod sign;
pub mod stage;
pub mod template;
pub mod timing;

pub use config::Config;
pub use error::BuildError;
pub use orchestrator::{run_build, BuildReport};
