//! Romifleur Core Library
//!
//! Browses catalogs of downloadable files exposed as directory listings on
//! remote hosts, filters and deduplicates them, queues selections and
//! downloads them concurrently with live progress.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`catalog`] - Collection registry, listing fetch/parse, size labels
//! - [`filter`] - Query, exclusion and region filters plus deduplication
//! - [`queue`] - In-memory download queue with JSON export/import
//! - [`download`] - Transfer primitive, worker pool and progress fan-out
//! - [`achievements`] - RetroAchievements compatibility lookups
//! - [`config`] - Persisted settings and download-root resolution

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod achievements;
pub mod catalog;
pub mod config;
pub mod download;
pub mod filter;
pub mod queue;
mod user_agent;

// Re-export commonly used types
pub use achievements::{AchievementsClient, GameTitle, is_compatible};
pub use catalog::{CatalogEntry, CatalogFetcher, CatalogRegistry, CatalogSource};
pub use config::{Settings, SettingsStore};
pub use download::{
    BatchProgress, CatalogTransfer, DEFAULT_CONCURRENCY, DownloadEngine, DownloadError,
    DownloadStats, HttpClient, StartRejection, Transfer,
};
pub use filter::{SearchOptions, deduplicate, filter_entries};
pub use queue::{DownloadQueue, QueueError, QueueItem};
