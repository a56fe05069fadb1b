//! Placeholder substitution and staging of resolved templates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::{Captures, Regex};

use super::resolve::{ResolvedTemplateSet, TemplateEntry};
use crate::common::{copy_file_with_dirs, write_file_with_dirs};
use crate::error::BuildError;
use crate::metadata::PackageMetadata;

/// `{{ key }}` or `{{ key:fallback }}`, whitespace around either part ignored.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder pattern is valid")
});

/// Substitute every placeholder in `text`.
///
/// Unknown keys render as the fallback if one is given, otherwise as an
/// empty string. This never fails.
pub fn render_str(text: &str, metadata: &PackageMetadata) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let expr = caps.get(1).map_or("", |m| m.as_str());
            let (key, fallback) = match expr.split_once(':') {
                Some((key, fallback)) => (key.trim(), fallback.trim()),
                None => (expr.trim(), ""),
            };
            match metadata.field(key) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => fallback.to_string(),
            }
        })
        .into_owned()
}

/// Render or copy one entry into `staging_root`, returning the written path.
pub fn render_entry(
    entry: &TemplateEntry,
    metadata: &PackageMetadata,
    staging_root: &Path,
) -> Result<PathBuf, BuildError> {
    let destination = entry.target(staging_root);
    let render_err = |source: io::Error| BuildError::Render {
        source_path: entry.source_path.clone(),
        destination: destination.clone(),
        source,
    };

    if entry.is_template {
        let text = fs::read_to_string(&entry.source_path).map_err(render_err)?;
        write_file_with_dirs(&destination, render_str(&text, metadata)).map_err(render_err)?;
        // Keep maintainer scripts executable.
        let permissions = fs::metadata(&entry.source_path)
            .map_err(render_err)?
            .permissions();
        fs::set_permissions(&destination, permissions).map_err(render_err)?;
    } else {
        copy_file_with_dirs(&entry.source_path, &destination).map_err(render_err)?;
    }

    Ok(destination)
}

/// Render the whole set on the rayon pool. Entries are independent, so the
/// order in which they are written is not significant.
pub fn render_all(
    set: &ResolvedTemplateSet,
    metadata: &PackageMetadata,
    staging_root: &Path,
) -> Result<Vec<PathBuf>, BuildError> {
    set.entries()
        .par_iter()
        .map(|entry| render_entry(entry, metadata, staging_root))
        .collect()
}
