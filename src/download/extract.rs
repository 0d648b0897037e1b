//! Archive unpacking after a completed transfer.

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument};

/// Archive formats unpacked after download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`
    Zip,
    /// `.7z`
    SevenZip,
}

impl ArchiveKind {
    /// Detects the archive kind from the file name; `None` for anything else.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".7z") {
            Some(Self::SevenZip)
        } else {
            None
        }
    }
}

/// Errors raised while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Opening the archive or removing it afterwards failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The zip reader rejected the archive.
    #[error("invalid zip archive {path}: {source}")]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// Reader error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The 7z reader rejected the archive.
    #[error("invalid 7z archive {path}: {message}")]
    SevenZip {
        /// Archive path.
        path: PathBuf,
        /// Reader error text.
        message: String,
    },

    /// The path is not a supported archive.
    #[error("not an archive: {path}")]
    Unsupported {
        /// Offending path.
        path: PathBuf,
    },

    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Unpacks `archive` into `dest_dir`.
///
/// Blocking; call from a blocking context.
///
/// # Errors
///
/// Returns [`ExtractError`] if the archive cannot be opened or decoded.
pub fn extract_archive(archive: &Path, dest_dir: &Path) -> Result<ArchiveKind, ExtractError> {
    let kind = ArchiveKind::from_path(archive).ok_or_else(|| ExtractError::Unsupported {
        path: archive.to_path_buf(),
    })?;

    match kind {
        ArchiveKind::Zip => {
            let file = File::open(archive).map_err(|source| ExtractError::Io {
                path: archive.to_path_buf(),
                source,
            })?;
            let mut zip = zip::ZipArchive::new(file).map_err(|source| ExtractError::Zip {
                path: archive.to_path_buf(),
                source,
            })?;
            zip.extract(dest_dir).map_err(|source| ExtractError::Zip {
                path: archive.to_path_buf(),
                source,
            })?;
        }
        ArchiveKind::SevenZip => {
            sevenz_rust::decompress_file(archive, dest_dir).map_err(|e| {
                ExtractError::SevenZip {
                    path: archive.to_path_buf(),
                    message: format!("{e:?}"),
                }
            })?;
        }
    }
    Ok(kind)
}

/// Unpacks `archive` into `dest_dir` on the blocking pool, then deletes it.
///
/// The archive is only removed after a successful extraction.
///
/// # Errors
///
/// Returns [`ExtractError`] if extraction or removal fails.
#[instrument(skip_all, fields(archive = %archive.display()))]
pub async fn extract_and_remove(archive: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let archive_path = archive.to_path_buf();
    let dest = dest_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest)).await??;

    tokio::fs::remove_file(archive)
        .await
        .map_err(|source| ExtractError::Io {
            path: archive.to_path_buf(),
            source,
        })?;
    info!("extracted and removed archive");
    Ok(())
}
