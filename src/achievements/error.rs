//! Error types for achievement lookups.
//!
//! Like catalog fetch errors, these are logged by [`AchievementsClient`](super::AchievementsClient)
//! and degrade to an empty game list.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while querying RetroAchievements or its cache file.
#[derive(Debug, Error)]
pub enum AchievementsError {
    /// Network-level failure.
    #[error("network error querying {url}: {source}")]
    Network {
        /// Endpoint URL (without the key).
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out.
    #[error("timeout querying {url}")]
    Timeout {
        /// Endpoint URL (without the key).
        url: String,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Endpoint URL (without the key).
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The endpoint URL could not be built.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response or cache file did not have the expected shape.
    #[error("unexpected data from {url}: {source}")]
    Decode {
        /// Endpoint URL or cache file path.
        url: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The cache could not be serialized.
    #[error("cannot encode achievements cache: {source}")]
    Encode {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Cache file IO failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Cache file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl AchievementsError {
    /// Creates a network error from a reqwest error, promoting timeouts.
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

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
