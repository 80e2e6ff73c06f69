//! Bounded, tracked execution of extraction workers

use super::ExtractionWorker;
use crate::error::ExtractionError;
use crate::events::EventSink;
use crate::types::{Event, ExtractionJob, ExtractionOutcome, WatchStats};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

/// Shared bookkeeping updated by pool tasks
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    discovered: AtomicU64,
    in_flight: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cleanup_failures: AtomicU64,
}

impl StatsCounters {
    fn record_dispatch(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    fn record_outcome(&self, outcome: &ExtractionOutcome) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if outcome.success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.cleanup_error.is_some() {
            self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> WatchStats {
        WatchStats {
            discovered: self.discovered.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
        }
    }
}

/// One lock per destination directory
///
/// Archives with the same stem (`report.zip`, `report.rar`) share a destination; their
/// extractions run one after the other. Entries are dropped once no job holds them.
#[derive(Debug, Default)]
pub(crate) struct DestinationLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl DestinationLocks {
    fn acquire(&self, destination: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(destination.to_path_buf()).or_default())
    }

    fn release(&self, destination: &Path, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(destination)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(destination);
        }
    }

    /// Number of destinations with a queued or running job
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Runs one task per job, at most `max_concurrent` extracting at once
///
/// Dispatch never blocks: jobs over the limit wait inside their own task for a permit.
/// Jobs sharing a destination directory never run at the same time.
/// Every dispatched job emits exactly one `ExtractionFinished` event, including when the
/// worker task panics.
pub struct ExtractionPool {
    worker: Arc<ExtractionWorker>,
    sink: Arc<dyn EventSink>,
    limit: Arc<Semaphore>,
    tracker: TaskTracker,
    stats: Arc<StatsCounters>,
    destinations: Arc<DestinationLocks>,
}

impl ExtractionPool {
    /// Create a pool with its own task tracker and counters
    pub fn new(
        worker: Arc<ExtractionWorker>,
        sink: Arc<dyn EventSink>,
        max_concurrent: usize,
    ) -> Self {
        Self::with_shared(
            worker,
            sink,
            max_concurrent,
            TaskTracker::new(),
            Arc::new(StatsCounters::default()),
            Arc::new(DestinationLocks::default()),
        )
    }

    /// Create a pool that registers its tasks and results with existing bookkeeping
    pub(crate) fn with_shared(
        worker: Arc<ExtractionWorker>,
        sink: Arc<dyn EventSink>,
        max_concurrent: usize,
        tracker: TaskTracker,
        stats: Arc<StatsCounters>,
        destinations: Arc<DestinationLocks>,
    ) -> Self {
        Self {
            worker,
            sink,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker,
            stats,
            destinations,
        }
    }

    /// Queue a job; returns immediately
    pub fn dispatch(&self, job: ExtractionJob) {
        self.stats.record_dispatch();

        let worker = Arc::clone(&self.worker);
        let sink = Arc::clone(&self.sink);
        let limit = Arc::clone(&self.limit);
        let stats = Arc::clone(&self.stats);
        let destinations = Arc::clone(&self.destinations);

        self.tracker.spawn(async move {
            let destination = job.destination.clone();
            let lock = destinations.acquire(&destination);
            let held = lock.lock().await;

            // The semaphore is never closed, so a permit always arrives eventually
            let permit = limit.acquire_owned().await.ok();
            debug!(source = ?job.source, "extraction slot acquired");

            let fallback = job.clone();
            let outcome = match tokio::spawn(async move { worker.extract(job).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(source = ?fallback.source, error = %e, "extraction task panicked");
                    ExtractionOutcome::failed(
                        &fallback,
                        ExtractionError::ExtractionFailed {
                            archive: fallback.source.clone(),
                            exit_code: None,
                            diagnostic: format!("extraction task panicked: {e}"),
                        },
                    )
                }
            };

            drop(permit);
            drop(held);
            destinations.release(&destination, lock);

            stats.record_outcome(&outcome);
            sink.emit(Event::ExtractionFinished { outcome });
        });
    }

    /// Number of jobs dispatched but not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Counters for everything this pool (and pools sharing its bookkeeping) ran
    pub fn stats(&self) -> WatchStats {
        self.stats.snapshot()
    }

    /// Wait until every dispatched job has finished, or `timeout` elapses
    ///
    /// Returns `true` if the pool drained in time. Jobs still running afterwards keep
    /// running; nothing is cancelled.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        drained
    }
}
