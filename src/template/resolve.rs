//! Template discovery and override merging.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::TEMPLATE_MARKER;
use crate::error::BuildError;

/// One discovered file and where it lands in the staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub source_path: PathBuf,
    /// Relative to the staging root, marker already stripped.
    pub destination_path: PathBuf,
    pub is_template: bool,
}

impl TemplateEntry {
    /// Build an entry for `source` found under `root`.
    ///
    /// Returns `None` when `source` is not below `root` or names no file.
    pub fn from_source(root: &Path, source: &Path) -> Option<Self> {
        let relative = source.strip_prefix(root).ok()?;
        let file_name = relative.file_name()?;

        let stripped = file_name
            .to_str()
            .and_then(|name| name.strip_prefix(TEMPLATE_MARKER))
            .filter(|rest| !rest.is_empty());

        let (is_template, destination_name) = match stripped {
            Some(rest) => (true, OsString::from(rest)),
            None => (false, file_name.to_os_string()),
        };

        Some(Self {
            source_path: source.to_path_buf(),
            destination_path: relative.with_file_name(destination_name),
            is_template,
        })
    }

    /// Absolute destination below `staging_root`.
    pub fn target(&self, staging_root: &Path) -> PathBuf {
        staging_root.join(&self.destination_path)
    }
}

/// Enumerate every regular file below `root`.
pub fn discover(root: &Path) -> Result<Vec<TemplateEntry>, BuildError> {
    let mut entries = Vec::new();

    for item in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let item = item.map_err(|e| BuildError::Discovery {
            root: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        if let Some(entry) = TemplateEntry::from_source(root, item.path()) {
            entries.push(entry);
        }
    }

    debug!(root = %root.display(), count = entries.len(), "discovered templates");
    Ok(entries)
}

/// Templates keyed by destination; exactly one entry per destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTemplateSet {
    entries: BTreeMap<PathBuf, TemplateEntry>,
}

impl ResolvedTemplateSet {
    /// Defaults first, then overrides replacing same-destination defaults.
    pub fn merge(defaults: Vec<TemplateEntry>, overrides: Vec<TemplateEntry>) -> Self {
        let mut set = Self::default();
        set.insert_layer(defaults);
        set.insert_layer(overrides);
        set
    }

    fn insert_layer(&mut self, layer: Vec<TemplateEntry>) {
        // Inside one root `_control` and `control` collide; the template wins.
        let mut layer_entries: BTreeMap<PathBuf, TemplateEntry> = BTreeMap::new();
        for entry in layer {
            if let Some(existing) = layer_entries.get(&entry.destination_path) {
                if existing.is_template && !entry.is_template {
                    debug!(
                        kept = %existing.source_path.display(),
                        dropped = %entry.source_path.display(),
                        "plain file shadowed by template in the same root"
                    );
                    continue;
                }
            }
            layer_entries.insert(entry.destination_path.clone(), entry);
        }

        for (destination, entry) in layer_entries {
            if let Some(replaced) = self.entries.insert(destination, entry) {
                debug!(replaced = %replaced.source_path.display(), "default template overridden");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, destination: &Path) -> Option<&TemplateEntry> {
        self.entries.get(destination)
    }

    pub fn entries(&self) -> Vec<&TemplateEntry> {
        self.entries.values().collect()
    }
}

/// Discover both roots and merge them.
///
/// A missing override root just means the connector ships no overrides. The
/// default root is bundled with the tool, so its absence is a configuration
/// error.
pub fn resolve(
    override_root: &Path,
    default_root: &Path,
) -> Result<ResolvedTemplateSet, BuildError> {
    if !default_root.is_dir() {
        return Err(BuildError::Discovery {
            root: default_root.to_path_buf(),
            reason: "default template directory does not exist".to_string(),
        });
    }
    let defaults = discover(default_root)?;

    let overrides = if !override_root.exists() {
        debug!(root = %override_root.display(), "no connector template overrides");
        Vec::new()
    } else if !override_root.is_dir() {
        return Err(BuildError::Discovery {
            root: override_root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    } else {
        discover(override_root)?
    };

    Ok(ResolvedTemplateSet::merge(defaults, overrides))
}
