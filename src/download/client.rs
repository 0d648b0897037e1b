//! HTTP client wrapper for streaming transfers.
//!
//! This module provides the `HttpClient` struct which streams a response body
//! into a temporary sibling file and renames it into place once complete.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, TEMP_SUFFIX};
use super::error::DownloadError;
use super::transfer::ProgressFn;
use crate::catalog::format_bytes;
use crate::user_agent;

/// HTTP client shared by listing fetches, transfers and achievement lookups.
///
/// Created once and cloned freely; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use romifleur_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .download_to_path("https://example.com/Game.zip", Path::new("./Game.zip"), None)
///     .await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 60 seconds between reads
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Streams `url` into `dest`, going through `<dest>.tmp`.
    ///
    /// `on_progress(fraction, bytes_so_far)` is called after every chunk when
    /// the response announces a non-zero length; otherwise it is not called.
    /// On any error the temporary file is removed and nothing is written at
    /// `dest`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - The body is shorter or longer than announced
    /// - Writing or renaming on disk fails
    #[instrument(skip(self, on_progress), fields(url = %url, dest = %dest.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<&ProgressFn>,
    ) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_get(url).await?;
        let content_length = response.content_length().filter(|len| *len > 0);
        let temp_path = temp_path_for(dest);
        debug!(temp = %temp_path.display(), ?content_length, "streaming to temporary file");

        let mut file = File::create(&temp_path)
            .await
            .map_err(|e| DownloadError::io(temp_path.clone(), e))?;

        let stream_result = stream_to_file(
            &mut file,
            response,
            url,
            &temp_path,
            content_length,
            on_progress,
        )
        .await;
        drop(file);

        let bytes_written = match stream_result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %temp_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        if let Some(expected) = content_length
            && expected != bytes_written
        {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DownloadError::integrity(temp_path, expected, bytes_written));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, dest).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DownloadError::io(dest, e));
        }

        info!(path = %dest.display(), bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }

    async fn send_get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// Listing and achievement lookups use it directly with per-request timeouts.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// `<dest>.tmp`, next to the final file.
#[must_use]
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
#[allow(clippy::cast_precision_loss)]
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    content_length: Option<u64>,
    on_progress: Option<&ProgressFn>,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;

        if let (Some(total), Some(report)) = (content_length, on_progress) {
            let fraction = (bytes_written as f64 / total as f64).min(1.0);
            report(fraction, &format_bytes(bytes_written));
        }
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/roms/NES/Game (Europe).zip")),
            PathBuf::from("/roms/NES/Game (Europe).zip.tmp")
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        let client = HttpClient::new();
        let dir = tempfile::TempDir::new().unwrap();
        let result = client
            .download_to_path("not a url", &dir.path().join("x.zip"), None)
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
