//! In-memory download queue with JSON export/import.
//!
//! # Overview
//!
//! - [`DownloadQueue`] - ordered, filename-deduplicated list behind one mutex
//! - [`QueueItem`] - one requested download, also the export record
//! - [`ImportReport`] - outcome of a bulk import
//! - [`QueueError`] - persistence/import error types
//!
//! The same mutex guards the batch progress counters, so queue edits and
//! progress read-modify-writes never interleave.
//!
//! # Example
//!
//! ```
//! use romifleur_core::queue::{DownloadQueue, QueueItem};
//!
//! let queue = DownloadQueue::new();
//! assert!(queue.add(QueueItem::new("Nintendo", "SNES", "Zelda (Europe).zip")));
//! // Same filename, different collection: still a duplicate.
//! assert!(!queue.add(QueueItem::new("Nintendo", "GBA", "Zelda (Europe).zip")));
//! assert_eq!(queue.len(), 1);
//! ```

mod error;
mod item;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, instrument};

pub use error::QueueError;
pub use item::QueueItem;

use crate::download::{BatchProgress, StartRejection};

/// Result type for queue persistence operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Revision-tagged progress snapshot, taken under the queue lock.
pub(crate) type Snapshot = (u64, BatchProgress);

/// Outcome of [`DownloadQueue::import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records added to the queue.
    pub added: usize,
    /// Records skipped because their filename was already queued.
    pub duplicates: usize,
    /// Records that were not a valid object or positional array.
    pub invalid: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<QueueItem>,
    progress: BatchProgress,
    revision: u64,
}

impl QueueState {
    fn snapshot(&mut self) -> Snapshot {
        self.revision += 1;
        (self.revision, self.progress.clone())
    }

    fn contains(&self, filename: &str) -> bool {
        self.items.iter().any(|item| item.filename == filename)
    }
}

/// Ordered list of requested downloads.
///
/// No two items share a filename. All operations take the single internal
/// lock and never block on I/O while holding it.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    state: Mutex<QueueState>,
}

impl DownloadQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` unless its filename is already queued.
    ///
    /// Returns false ("not added") for a duplicate.
    #[instrument(skip(self, item), fields(filename = %item.filename))]
    pub fn add(&self, item: QueueItem) -> bool {
        let mut state = self.lock();
        if state.contains(&item.filename) {
            debug!("duplicate in queue");
            return false;
        }
        info!(size = %item.size, "added to queue");
        state.items.push(item);
        true
    }

    /// Adds each item in order, returning how many were added.
    pub fn add_batch(&self, items: impl IntoIterator<Item = QueueItem>) -> usize {
        items
            .into_iter()
            .map(|item| self.add(item))
            .filter(|added| *added)
            .count()
    }

    /// Removes the item at `index`; `None` when out of range.
    pub fn remove(&self, index: usize) -> Option<QueueItem> {
        let mut state = self.lock();
        if index >= state.items.len() {
            return None;
        }
        let removed = state.items.remove(index);
        info!(filename = %removed.filename, "removed from queue");
        Some(removed)
    }

    /// Empties the queue, returning the number of removed items.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let count = state.items.len();
        state.items.clear();
        info!(count, "cleared queue");
        count
    }

    /// Copies the queued items in order.
    #[must_use]
    pub fn items(&self) -> Vec<QueueItem> {
        self.lock().items.clone()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns true while a batch is running.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.lock().progress.is_downloading
    }

    /// Serializes the queue as a pretty JSON array of records.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Json`] if serialization fails.
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.items()).map_err(QueueError::json)
    }

    /// Adds every record of a parsed import document.
    ///
    /// Records are objects `{category, console, filename, size?}` or legacy
    /// positional arrays; malformed records are counted and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotAList`] if the document is not an array.
    pub fn import(&self, document: &Value) -> Result<ImportReport> {
        let Value::Array(records) = document else {
            return Err(QueueError::NotAList {
                found: json_type_name(document),
            });
        };

        let mut report = ImportReport::default();
        for record in records {
            match QueueItem::from_record(record) {
                Some(item) => {
                    if self.add(item) {
                        report.added += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
                None => report.invalid += 1,
            }
        }
        info!(
            added = report.added,
            duplicates = report.duplicates,
            invalid = report.invalid,
            "imported queue records"
        );
        Ok(report)
    }

    /// Parses `raw` as JSON and imports it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Json`] for invalid JSON, or
    /// [`QueueError::NotAList`] for a non-array document.
    pub fn import_json(&self, raw: &str) -> Result<ImportReport> {
        let document: Value = serde_json::from_str(raw).map_err(QueueError::json)?;
        self.import(&document)
    }

    /// Writes the export document to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = self.export()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| QueueError::io(parent, e))?;
        }
        std::fs::write(path, raw).map_err(|e| QueueError::io(path, e))?;
        debug!(path = %path.display(), "saved queue");
        Ok(())
    }

    /// Loads a queue from an export document; a missing file is an empty
    /// queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let queue = Self::new();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                queue.import_json(&raw)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no saved queue");
            }
            Err(e) => return Err(QueueError::io(path, e)),
        }
        Ok(queue)
    }

    /// Current progress without bumping the revision.
    pub(crate) fn progress(&self) -> BatchProgress {
        self.lock().progress.clone()
    }

    /// Snapshots the queue and marks a batch as running.
    pub(crate) fn begin_batch(
        &self,
    ) -> std::result::Result<(Vec<QueueItem>, Snapshot), StartRejection> {
        let mut state = self.lock();
        if state.progress.is_downloading {
            return Err(StartRejection::AlreadyRunning);
        }
        if state.items.is_empty() {
            return Err(StartRejection::EmptyQueue);
        }

        let items = state.items.clone();
        state.progress = BatchProgress::starting(items.len());
        Ok((items, state.snapshot()))
    }

    /// Records that a transfer of `filename` began.
    pub(crate) fn record_started(&self, filename: &str) -> Snapshot {
        let mut state = self.lock();
        filename.clone_into(&mut state.progress.current_file);
        state.progress.refresh_status();
        state.snapshot()
    }

    /// Records one finished transfer attempt, successful or not.
    pub(crate) fn record_finished(&self) -> Snapshot {
        let mut state = self.lock();
        let progress = &mut state.progress;
        progress.current = (progress.current + 1).min(progress.total);
        progress.refresh_status();
        state.snapshot()
    }

    /// Ends the batch: the queue is emptied whatever the per-item outcome,
    /// including items added while the batch ran.
    pub(crate) fn finish_batch(&self) -> Snapshot {
        let mut state = self.lock();
        let cleared = state.items.len();
        state.items.clear();
        state.progress.finish();
        debug!(cleared, "batch finished, queue cleared");
        state.snapshot()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
