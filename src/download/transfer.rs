//! Single-item transfer: object URL, destination path, download and unpack.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use super::HttpClient;
use super::error::DownloadError;
use super::extract::{ArchiveKind, extract_and_remove};
use crate::catalog::{CatalogRegistry, CatalogSource};
use crate::config::SettingsStore;
use crate::queue::QueueItem;

/// Per-item progress callback: `(fraction 0.0..=1.0, label)`.
///
/// Labels are a human byte count while streaming, `"Exists"`, `"Done"` or
/// `"Error: <text>"`.
pub type ProgressFn = dyn Fn(f64, &str) + Send + Sync;

/// Moves one queue item from its remote collection onto local disk.
///
/// Failures never escape: implementations report them through the progress
/// callback and return `false`.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Transfers `item`, returning true on success.
    async fn transfer(&self, item: &QueueItem, on_progress: Option<&ProgressFn>) -> bool;
}

/// How a successful transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Exists,
    Downloaded,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Self::Exists => "Exists",
            Self::Downloaded => "Done",
        }
    }
}

/// [`Transfer`] over registry collections, writing under the configured
/// download root.
#[derive(Debug, Clone)]
pub struct CatalogTransfer {
    registry: Arc<CatalogRegistry>,
    client: HttpClient,
    settings: Arc<SettingsStore>,
}

impl CatalogTransfer {
    /// Creates a transfer primitive.
    #[must_use]
    pub fn new(
        registry: Arc<CatalogRegistry>,
        client: HttpClient,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            registry,
            client,
            settings,
        }
    }

    /// Local path an item lands at, without touching the filesystem beyond
    /// resolving the download root.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::UnknownCollection`] for an unregistered
    /// collection and [`DownloadError::InvalidFilename`] for a filename that
    /// would leave its folder.
    pub fn destination(&self, item: &QueueItem) -> Result<PathBuf, DownloadError> {
        let root = self.settings.download_root();
        self.resolve(item, &root).map(|(_, dest)| dest)
    }

    fn resolve(
        &self,
        item: &QueueItem,
        root: &Path,
    ) -> Result<(&CatalogSource, PathBuf), DownloadError> {
        let source = self
            .registry
            .get(&item.category, &item.collection)
            .ok_or_else(|| DownloadError::unknown_collection(&item.category, &item.collection))?;
        validate_filename(&item.filename)?;
        let dest = root
            .join(source.folder_or(&item.collection))
            .join(&item.filename);
        Ok((source, dest))
    }

    /// Resolves (and creates) the download root off the async worker.
    async fn download_root(&self) -> Result<PathBuf, DownloadError> {
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || settings.download_root())
            .await
            .map_err(|e| DownloadError::io(PathBuf::new(), std::io::Error::other(e)))
    }

    async fn run(
        &self,
        item: &QueueItem,
        on_progress: Option<&ProgressFn>,
    ) -> Result<Outcome, DownloadError> {
        let root = self.download_root().await?;
        let (source, dest) = self.resolve(item, &root)?;

        let folder = dest
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| DownloadError::invalid_filename(&item.filename))?;
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| DownloadError::io(&folder, e))?;

        if tokio::fs::try_exists(&dest)
            .await
            .map_err(|e| DownloadError::io(&dest, e))?
        {
            info!(path = %dest.display(), "file already exists");
            return Ok(Outcome::Exists);
        }

        let url = object_url(&source.url, &item.filename);
        info!(url = %url, "downloading");
        self.client
            .download_to_path(&url, &dest, on_progress)
            .await?;

        if let Some(kind) = ArchiveKind::from_path(&dest) {
            debug!(?kind, "unpacking archive");
            if let Err(e) = extract_and_remove(&dest, &folder).await {
                warn!(path = %dest.display(), error = %e, "extraction failed, keeping archive");
            }
        }

        Ok(Outcome::Downloaded)
    }
}

#[async_trait]
impl Transfer for CatalogTransfer {
    #[instrument(skip(self, item, on_progress), fields(filename = %item.filename))]
    async fn transfer(&self, item: &QueueItem, on_progress: Option<&ProgressFn>) -> bool {
        let report = |fraction: f64, label: &str| {
            if let Some(report) = on_progress {
                report(fraction, label);
            }
        };

        match self.run(item, on_progress).await {
            Ok(outcome) => {
                report(1.0, outcome.label());
                true
            }
            Err(e) => {
                error!(error = %e, "transfer failed");
                report(0.0, &format!("Error: {e}"));
                false
            }
        }
    }
}

/// Builds the URL of one object inside a collection.
///
/// Known hosts get a `/` separator and a percent-encoded filename; any other
/// base is joined to the raw filename as-is.
#[must_use]
pub fn object_url(base_url: &str, filename: &str) -> String {
    if base_url.contains("myrient") || base_url.contains("archive.org") {
        let separator = if base_url.ends_with('/') { "" } else { "/" };
        format!("{base_url}{separator}{}", urlencoding::encode(filename))
    } else {
        format!("{base_url}{filename}")
    }
}

fn validate_filename(filename: &str) -> Result<(), DownloadError> {
    let path = Path::new(filename);
    let mut components = path.components().peekable();
    if components.peek().is_none()
        || !components.all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(DownloadError::invalid_filename(filename));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_for_known_hosts() {
        assert_eq!(
            object_url(
                "https://myrient.erista.me/files/No-Intro/Nintendo%20-%20NES",
                "Zelda (Europe).zip"
            ),
            "https://myrient.erista.me/files/No-Intro/Nintendo%20-%20NES/Zelda%20%28Europe%29.zip"
        );
        assert_eq!(
            object_url("https://archive.org/download/set/", "A & B.7z"),
            "https://archive.org/download/set/A%20%26%20B.7z"
        );
    }

    #[test]
    fn test_object_url_raw_for_other_hosts() {
        assert_eq!(
            object_url("http://127.0.0.1:8080/roms/", "Game (USA).zip"),
            "http://127.0.0.1:8080/roms/Game (USA).zip"
        );
        // No separator is inserted for unknown hosts.
        assert_eq!(
            object_url("http://host/roms", "Game.zip"),
            "http://host/romsGame.zip"
        );
    }

    #[test]
    fn test_validate_filename_rejects_escapes() {
        assert!(validate_filename("Game (Europe).zip").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("../Game.zip").is_err());
        assert!(validate_filename("/etc/passwd").is_err());
        assert!(validate_filename("./Game.zip").is_err());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Exists.label(), "Exists");
        assert_eq!(Outcome::Downloaded.label(), "Done");
    }
}
