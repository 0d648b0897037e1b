//! Transfers and the concurrent download engine.
//!
//! This module provides functionality for moving queued items onto disk
//! and running batches of them with live progress.
//!
//! # Features
//!
//! - Streaming downloads through a `.tmp` sibling, renamed on completion
//! - `.zip` / `.7z` unpacking after download
//! - Bounded worker pool (3 by default)
//! - Progress fan-out to pollers, channel subscribers and callbacks
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use romifleur_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let bytes = client
//!     .download_to_path("https://example.com/Game.zip", Path::new("./Game.zip"), None)
//!     .await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod extract;
mod progress;
mod transfer;

pub use client::{HttpClient, temp_path_for};
pub use engine::{
    BatchHandle, DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, EngineError, StartRejection,
};
pub use error::DownloadError;
pub use extract::{ArchiveKind, ExtractError, extract_and_remove, extract_archive};
pub use progress::{BatchProgress, CallbackError, ProgressCallback, ProgressHub, SubscriptionId};
pub use transfer::{CatalogTransfer, ProgressFn, Transfer, object_url};

// No module-local Result alias: use `Result<T, DownloadError>` explicitly.
