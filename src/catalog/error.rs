//! Error types for the catalog module.
//!
//! Fetch errors never reach callers of [`CatalogFetcher::fetch`](super::CatalogFetcher::fetch):
//! they are logged there and degrade to an empty entry list. The structured
//! variants exist so the log line says exactly what went wrong.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading the registry or fetching a listing.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The `(category, key)` pair is not in the registry.
    #[error("unknown collection {category}/{key}")]
    UnknownCollection {
        /// Registry category (e.g. "Nintendo").
        category: String,
        /// Collection key within the category (e.g. "NES").
        key: String,
    },

    /// Network-level failure while requesting a listing.
    #[error("network error fetching listing {url}: {source}")]
    Network {
        /// Listing URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Listing request timed out.
    #[error("timeout fetching listing {url}")]
    Timeout {
        /// Listing URL.
        url: String,
    },

    /// Listing host answered with a non-success status.
    #[error("HTTP {status} fetching listing {url}")]
    HttpStatus {
        /// Listing URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Registry file could not be read.
    #[error("IO error reading registry {path}: {source}")]
    Io {
        /// Registry file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Registry document is not valid JSON for the expected layout.
    #[error("invalid registry document: {source}")]
    InvalidRegistry {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    /// Creates an unknown-collection error.
    pub fn unknown_collection(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownCollection {
            category: category.into(),
            key: key.into(),
        }
    }

    /// Creates a network error, promoting timeouts to [`CatalogError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a registry IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
