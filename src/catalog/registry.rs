//! Catalog source registry.
//!
//! The registry is a static JSON document mapping categories to collections:
//!
//! ```json
//! {
//!   "Nintendo": {
//!     "NES": {
//!       "name": "Nintendo Entertainment System",
//!       "url": "https://myrient.erista.me/files/No-Intro/Nintendo%20-%20NES/",
//!       "exts": [".zip"],
//!       "folder": "NES"
//!     }
//!   }
//! }
//! ```
//!
//! It is loaded once and shared read-only (usually behind an `Arc`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::CatalogError;

/// Registry document bundled with the crate, used when no file is configured.
pub const BUILTIN_REGISTRY: &str = include_str!("../../data/consoles.json");

/// Static description of one remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Display name. Empty when the document omits it.
    #[serde(default)]
    pub name: String,
    /// Directory listing URL; also the base for object URLs.
    pub url: String,
    /// Accepted file extensions, including the dot (".zip").
    pub exts: Vec<String>,
    /// Destination folder under the download root.
    #[serde(default)]
    pub folder: Option<String>,
}

impl CatalogSource {
    /// Returns true if `href` ends with one of the accepted extensions.
    #[must_use]
    pub fn accepts(&self, href: &str) -> bool {
        self.exts.iter().any(|ext| href.ends_with(ext.as_str()))
    }

    /// Destination folder, falling back to the collection key.
    #[must_use]
    pub fn folder_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.folder
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(key)
    }

    /// Display name, falling back to the collection key.
    #[must_use]
    pub fn name_or<'a>(&'a self, key: &'a str) -> &'a str {
        if self.name.is_empty() {
            key
        } else {
            &self.name
        }
    }
}

/// Read-only registry keyed by `(category, collection key)`.
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    categories: BTreeMap<String, BTreeMap<String, CatalogSource>>,
}

impl CatalogRegistry {
    /// Parses a registry document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRegistry`] if the JSON does not match the
    /// expected layout.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let categories =
            serde_json::from_str(raw).map_err(|source| CatalogError::InvalidRegistry { source })?;
        Ok(Self { categories })
    }

    /// Loads the registry from a file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or
    /// [`CatalogError::InvalidRegistry`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let registry = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            collections = registry.len(),
            "loaded catalog registry"
        );
        Ok(registry)
    }

    /// Returns the registry bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRegistry`] if the bundled document is
    /// malformed.
    pub fn builtin() -> Result<Self, CatalogError> {
        debug!("using built-in catalog registry");
        Self::from_json(BUILTIN_REGISTRY)
    }

    /// Creates a registry from explicit entries (used by tests and embedders).
    #[must_use]
    pub fn from_sources(
        sources: impl IntoIterator<Item = (String, String, CatalogSource)>,
    ) -> Self {
        let mut categories: BTreeMap<String, BTreeMap<String, CatalogSource>> = BTreeMap::new();
        for (category, key, source) in sources {
            categories.entry(category).or_default().insert(key, source);
        }
        Self { categories }
    }

    /// Looks up one collection.
    #[must_use]
    pub fn get(&self, category: &str, key: &str) -> Option<&CatalogSource> {
        self.categories.get(category)?.get(key)
    }

    /// Iterates categories in name order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Iterates the collections of one category in key order.
    pub fn collections(&self, category: &str) -> impl Iterator<Item = (&str, &CatalogSource)> {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|c| c.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Total number of collections across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the registry has no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
