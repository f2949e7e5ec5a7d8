//! [`AssetLibrary`] – catalog of named model assets.
//!
//! Pre-built models ship as `.usdz` files in the application bundle and are
//! requested by bare name (`"toy_robot"`, not `"toy_robot.usdz"`).  A load
//! for a name that is not in the catalog fails with
//! [`RenderError::AssetUnavailable`].

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::renderer::RenderError;

const MODEL_EXTENSION: &str = "usdz";

/// Set of asset names that a renderer can load.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    names: BTreeSet<String>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`AssetLibrary::register`].
    pub fn with_asset(mut self, name: &str) -> Self {
        self.register(name);
        self
    }

    /// Register every `*.usdz` file directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AssetUnavailable`] when the directory cannot be
    /// read.
    pub fn from_dir(dir: &Path) -> Result<Self, RenderError> {
        let entries = fs::read_dir(dir).map_err(|e| RenderError::AssetUnavailable {
            name: dir.display().to_string(),
            details: format!("cannot read asset directory: {e}"),
        })?;

        let mut library = Self::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_model = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION));
            if is_model && let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                library.register(stem);
            }
        }
        debug!(dir = %dir.display(), count = library.len(), "asset library scanned");
        Ok(library)
    }

    /// Add `name` to the catalog.  A trailing `.usdz` is ignored.
    pub fn register(&mut self, name: &str) {
        self.names.insert(normalize(name).to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(normalize(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve `name` to its catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AssetUnavailable`] for unknown names.
    pub fn load(&self, name: &str) -> Result<&str, RenderError> {
        self.names
            .get(normalize(name))
            .map(String::as_str)
            .ok_or_else(|| RenderError::AssetUnavailable {
                name: name.to_string(),
                details: "not found in asset library".to_string(),
            })
    }
}

fn normalize(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case(MODEL_EXTENSION) => stem,
        _ => trimmed,
    }
}
