//! Download engine: drains a queue snapshot through a bounded worker pool.
//!
//! # Overview
//!
//! [`DownloadEngine::start`] validates the queue, snapshots it, and spawns the
//! batch on the current Tokio runtime. Each item runs in its own task behind a
//! semaphore permit, so at most `concurrency` transfers are in flight. Every
//! state change is published to the engine's [`ProgressHub`]. When the batch
//! ends the queue is cleared, whatever the per-item outcome.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use romifleur_core::catalog::CatalogRegistry;
//! use romifleur_core::config::SettingsStore;
//! use romifleur_core::download::{CatalogTransfer, DownloadEngine, HttpClient};
//! use romifleur_core::queue::{DownloadQueue, QueueItem};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(CatalogRegistry::builtin()?);
//! let settings = Arc::new(SettingsStore::in_memory(Default::default()));
//! let transfer = Arc::new(CatalogTransfer::new(registry, HttpClient::new(), settings));
//! let queue = Arc::new(DownloadQueue::new());
//! queue.add(QueueItem::new("Nintendo", "NES", "Tetris (USA).zip"));
//!
//! let engine = DownloadEngine::with_default_concurrency(queue, transfer);
//! let stats = engine.start()?.wait().await;
//! println!("Succeeded: {}, Failed: {}", stats.succeeded(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::progress::{BatchProgress, ProgressCallback, ProgressHub, SubscriptionId};
use super::transfer::{ProgressFn, Transfer};
use crate::queue::{DownloadQueue, QueueItem};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 16;

/// Default worker pool capacity.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Why a batch was not started. No state changes in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartRejection {
    /// A batch is already running.
    #[error("a download batch is already running")]
    AlreadyRunning,
    /// Nothing is queued.
    #[error("the download queue is empty")]
    EmptyQueue,
    /// `start` was called outside a Tokio runtime.
    #[error("no Tokio runtime available to run the batch")]
    NoRuntime,
}

/// Statistics from a download batch run.
///
/// Uses atomic counters for thread-safe updates from concurrent transfer
/// tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful transfers (including files that
    /// already existed).
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of failed transfers.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the total number of items processed (succeeded + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn copy_of(&self) -> Self {
        Self {
            succeeded: AtomicUsize::new(self.succeeded()),
            failed: AtomicUsize::new(self.failed()),
        }
    }
}

/// Handle to a running batch.
#[derive(Debug)]
pub struct BatchHandle {
    total: usize,
    handle: JoinHandle<DownloadStats>,
}

impl BatchHandle {
    /// Number of items in the batch snapshot.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Waits for the batch to end.
    ///
    /// The queue has been cleared and the final snapshot published by the
    /// time this returns.
    pub async fn wait(self) -> DownloadStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "download batch task did not complete");
                DownloadStats::default()
            }
        }
    }
}

/// Orchestrates download batches over a shared queue.
///
/// # Concurrency Model
///
/// - Each transfer runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each transfer
/// - Permits are released automatically when transfers complete (RAII)
/// - Progress counters live under the queue's lock; snapshots are published
///   after it is released
pub struct DownloadEngine {
    queue: Arc<DownloadQueue>,
    transfer: Arc<dyn Transfer>,
    hub: Arc<ProgressHub>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("queue", &self.queue)
            .field("hub", &self.hub)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine with the given worker pool capacity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-16).
    #[instrument(level = "debug", skip(queue, transfer))]
    pub fn new(
        queue: Arc<DownloadQueue>,
        transfer: Arc<dyn Transfer>,
        concurrency: usize,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        debug!(concurrency, "creating download engine");

        let hub = Arc::new(ProgressHub::new(queue.progress()));
        Ok(Self {
            queue,
            transfer,
            hub,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Creates an engine with [`DEFAULT_CONCURRENCY`] workers.
    #[must_use]
    pub fn with_default_concurrency(
        queue: Arc<DownloadQueue>,
        transfer: Arc<dyn Transfer>,
    ) -> Self {
        let hub = Arc::new(ProgressHub::new(queue.progress()));
        Self {
            queue,
            transfer,
            hub,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The queue this engine drains.
    #[must_use]
    pub fn queue(&self) -> &Arc<DownloadQueue> {
        &self.queue
    }

    /// Returns true while a batch is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.queue.is_downloading()
    }

    /// Latest progress snapshot.
    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        self.hub.progress()
    }

    /// Receives every progress snapshot published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BatchProgress> {
        self.hub.subscribe()
    }

    /// Registers a progress callback; see [`ProgressHub::register_callback`].
    pub fn register_callback(&self, callback: ProgressCallback) -> SubscriptionId {
        self.hub.register_callback(callback)
    }

    /// Removes a progress callback.
    pub fn unregister_callback(&self, id: SubscriptionId) -> bool {
        self.hub.unregister_callback(id)
    }

    /// The hub progress is published to.
    #[must_use]
    pub fn hub(&self) -> &Arc<ProgressHub> {
        &self.hub
    }

    /// Starts a batch over the current queue contents and returns at once.
    ///
    /// # Errors
    ///
    /// Returns [`StartRejection`] if a batch is running, the queue is empty,
    /// or there is no runtime to spawn on. Nothing changes in that case.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<BatchHandle, StartRejection> {
        let runtime = Handle::try_current().map_err(|_| StartRejection::NoRuntime)?;
        let (items, snapshot) = self.queue.begin_batch()?;
        let total = items.len();
        info!(
            total,
            concurrency = self.concurrency,
            "starting download batch"
        );
        self.hub.publish(snapshot);

        let handle = runtime.spawn(run_batch(
            items,
            Arc::clone(&self.queue),
            Arc::clone(&self.transfer),
            Arc::clone(&self.hub),
            Arc::clone(&self.semaphore),
        ));
        Ok(BatchHandle { total, handle })
    }
}

/// Ends the batch when dropped, so the queue is cleared and
/// `is_downloading` reset even if the batch future unwinds.
struct FinishGuard<'a> {
    queue: &'a DownloadQueue,
    hub: &'a ProgressHub,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.hub.publish(self.queue.finish_batch());
        info!("download batch complete");
    }
}

async fn run_batch(
    items: Vec<QueueItem>,
    queue: Arc<DownloadQueue>,
    transfer: Arc<dyn Transfer>,
    hub: Arc<ProgressHub>,
    semaphore: Arc<Semaphore>,
) -> DownloadStats {
    let _finish = FinishGuard {
        queue: &queue,
        hub: &hub,
    };
    let stats = Arc::new(DownloadStats::new());
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        // Acquire semaphore permit (waits while the pool is full)
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            warn!(filename = %item.filename, "worker pool closed, item not attempted");
            stats.increment_failed();
            hub.publish(queue.record_finished());
            continue;
        };

        let queue = Arc::clone(&queue);
        let transfer = Arc::clone(&transfer);
        let hub = Arc::clone(&hub);
        let stats = Arc::clone(&stats);

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            hub.publish(queue.record_started(&item.filename));

            let filename = item.filename.clone();
            let report = move |fraction: f64, label: &str| {
                trace!(filename = %filename, fraction, label, "transfer progress");
            };
            let on_progress: &ProgressFn = &report;

            if transfer.transfer(&item, Some(on_progress)).await {
                info!(filename = %item.filename, "transfer succeeded");
                stats.increment_succeeded();
            } else {
                warn!(filename = %item.filename, "transfer failed");
                stats.increment_failed();
            }
            hub.publish(queue.record_finished());
        }));
    }

    debug!(
        task_count = handles.len(),
        "waiting for transfers to complete"
    );

    for handle in handles {
        // A panicking transfer still counts as one finished attempt.
        if let Err(e) = handle.await {
            warn!(error = %e, "transfer task panicked");
            stats.increment_failed();
            hub.publish(queue.record_finished());
        }
    }

    info!(
        succeeded = stats.succeeded(),
        failed = stats.failed(),
        total = stats.total(),
        "all transfers finished"
    );

    match Arc::try_unwrap(stats) {
        Ok(stats) => stats,
        Err(shared) => shared.copy_of(),
    }
}
