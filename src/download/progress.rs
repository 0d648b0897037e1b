//! Batch progress snapshots and their fan-out to subscribers.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{trace, warn};

/// Capacity of the push channel; slow receivers observe `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// Aggregated state of the current (or last) batch.
///
/// The poll snapshot and the push payload share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Finished transfer attempts, successful or not.
    pub current: usize,
    /// Items in the batch snapshot.
    pub total: usize,
    /// `current / total`, in `0.0..=1.0`.
    pub percentage: f64,
    /// Human-readable status line.
    pub status: String,
    /// Most recently started filename; empty when idle.
    pub current_file: String,
    /// True between a successful start and the end of the batch.
    pub is_downloading: bool,
}

impl BatchProgress {
    pub(crate) fn starting(total: usize) -> Self {
        Self {
            current: 0,
            total,
            percentage: 0.0,
            status: "Starting downloads...".to_string(),
            current_file: String::new(),
            is_downloading: true,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn refresh_status(&mut self) {
        self.percentage = if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        };
        self.status = format!("Downloading... [{}/{}]", self.current, self.total);
    }

    pub(crate) fn finish(&mut self) {
        self.is_downloading = false;
        self.status = "Download complete!".to_string();
        self.current_file.clear();
    }
}

/// Error a progress callback may report; logged and otherwise ignored.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// Registered progress callback.
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) -> Result<(), CallbackError> + Send + Sync>;

/// Handle returned by [`ProgressHub::register_callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Publishes progress snapshots to pollers, channel subscribers and callbacks.
///
/// Snapshots carry the revision they were taken at; a snapshot older than the
/// one already published is dropped, so subscribers never see progress go
/// backwards.
pub struct ProgressHub {
    latest: watch::Sender<(u64, BatchProgress)>,
    events: broadcast::Sender<BatchProgress>,
    callbacks: Mutex<BTreeMap<SubscriptionId, ProgressCallback>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ProgressHub")
            .field("latest", &*self.latest.borrow())
            .field("receivers", &self.events.receiver_count())
            .field("callbacks", &callbacks)
            .finish()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(BatchProgress::default())
    }
}

impl ProgressHub {
    /// Creates a hub whose poll snapshot starts at `initial`.
    #[must_use]
    pub fn new(initial: BatchProgress) -> Self {
        let (latest, _) = watch::channel((0, initial));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            latest,
            events,
            callbacks: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        self.latest.borrow().1.clone()
    }

    /// Receives every snapshot published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BatchProgress> {
        self.events.subscribe()
    }

    /// Watches the latest `(revision, snapshot)` pair.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<(u64, BatchProgress)> {
        self.latest.subscribe()
    }

    /// Registers a callback invoked with every published snapshot.
    pub fn register_callback(&self, callback: ProgressCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        id
    }

    /// Removes a callback; false if it was not registered.
    pub fn unregister_callback(&self, id: SubscriptionId) -> bool {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Publishes a snapshot taken at `revision`.
    ///
    /// Must be called without holding the queue lock. Callbacks run on the
    /// calling task; errors and panics are logged and do not reach the caller
    /// or the remaining callbacks.
    pub fn publish(&self, (revision, progress): (u64, BatchProgress)) {
        let fresh = self.latest.send_if_modified(|latest| {
            if revision <= latest.0 {
                return false;
            }
            *latest = (revision, progress.clone());
            // No receivers is not an error here.
            let _ = self.events.send(progress.clone());
            true
        });
        if !fresh {
            trace!(revision, "dropping stale progress snapshot");
            return;
        }

        let callbacks: Vec<(SubscriptionId, ProgressCallback)> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(&progress))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(subscription = id.0, error = %e, "progress callback failed"),
                Err(_) => warn!(subscription = id.0, "progress callback panicked"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn snapshot(current: usize) -> BatchProgress {
        let mut progress = BatchProgress::starting(4);
        progress.current = current;
        progress.refresh_status();
        progress
    }

    fn counting_callback(calls: &Arc<AtomicUsize>) -> ProgressCallback {
        let counter = Arc::clone(calls);
        Arc::new(move |_: &BatchProgress| -> Result<(), CallbackError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(BatchProgress::starting(2)).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "current",
                "current_file",
                "is_downloading",
                "percentage",
                "status",
                "total"
            ]
        );
    }

    #[test]
    fn test_publish_updates_poll_and_channel() {
        let hub = ProgressHub::default();
        let mut rx = hub.subscribe();

        hub.publish((1, snapshot(1)));

        assert_eq!(hub.progress().current, 1);
        assert_eq!(rx.try_recv().unwrap().current, 1);
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let hub = ProgressHub::default();
        let mut rx = hub.subscribe();

        hub.publish((5, snapshot(3)));
        hub.publish((4, snapshot(2)));

        assert_eq!(hub.progress().current, 3);
        assert_eq!(rx.try_recv().unwrap().current, 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failing_callbacks_do_not_stop_others() {
        let hub = ProgressHub::default();
        let calls = Arc::new(AtomicUsize::new(0));

        hub.register_callback(Arc::new(|_: &BatchProgress| -> Result<(), CallbackError> {
            Err("subscriber went away".into())
        }));
        hub.register_callback(Arc::new(|_: &BatchProgress| -> Result<(), CallbackError> {
            panic!("subscriber bug")
        }));
        hub.register_callback(counting_callback(&calls));

        hub.publish((1, snapshot(1)));
        hub.publish((2, snapshot(2)));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister_callback() {
        let hub = ProgressHub::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = hub.register_callback(counting_callback(&calls));

        hub.publish((1, snapshot(1)));
        assert!(hub.unregister_callback(id));
        assert!(!hub.unregister_callback(id));
        hub.publish((2, snapshot(2)));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_status_percentage() {
        let progress = snapshot(1);
        assert!((progress.percentage - 0.25).abs() < f64::EPSILON);
        assert_eq!(progress.status, "Downloading... [1/4]");
    }
}
