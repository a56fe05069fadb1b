//! Layered Debian file templates.
//!
//! Two roots feed the staging tree: the connector's own
//! `.installer/debian/templates` (overrides) and the tool's bundled
//! `templates` directory (defaults). Files whose name starts with
//! [`TEMPLATE_MARKER`] are rendered with package metadata, everything else
//! is copied byte for byte.

pub mod render;
pub mod resolve;

pub use render::{render_all, render_entry, render_str};
pub use resolve::{discover, resolve, ResolvedTemplateSet, TemplateEntry};

/// Leading filename character that marks a file as a template.
pub const TEMPLATE_MARKER: char = '_';

/// Override root, relative to the connector directory.
pub const OVERRIDE_TEMPLATE_DIR: &str = ".installer/debian/templates";

/// Bundled default root, relative to the tool directory.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
