//! The scan loop and its de-duplication set

use crate::config::WatchConfig;
use crate::detector::ArchiveDetector;
use crate::error::ExtractionError;
use crate::events::EventSink;
use crate::types::{Event, ExtractionJob, WatcherState};
use crate::worker::ExtractionPool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often an ongoing watch directory outage is reported again
const UNAVAILABLE_REMINDER_INTERVAL: Duration = Duration::from_secs(300);

/// Paths already dispatched during one watch session
///
/// Only grows. A file that is deleted and later re-created under the same path is not
/// extracted again until a new session starts.
#[derive(Debug, Default)]
pub struct SeenSet {
    paths: HashSet<PathBuf>,
}

impl SeenSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`; returns `true` if it had not been seen before
    pub fn insert(&mut self, path: &Path) -> bool {
        if self.paths.contains(path) {
            return false;
        }
        self.paths.insert(path.to_path_buf())
    }

    /// Whether `path` was already recorded
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Number of recorded paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// State owned by the scan task of one session
pub(crate) struct PollLoop {
    config: Arc<WatchConfig>,
    detector: ArchiveDetector,
    seen: SeenSet,
    pool: ExtractionPool,
    sink: Arc<dyn EventSink>,
    /// When the current outage was last reported; `None` while the directory is readable
    last_unavailable_report: Option<Instant>,
    reminder_interval: Duration,
}

impl PollLoop {
    pub(crate) fn new(
        config: Arc<WatchConfig>,
        pool: ExtractionPool,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            detector: ArchiveDetector::new(&config.extensions),
            config,
            seen: SeenSet::new(),
            pool,
            sink,
            last_unavailable_report: None,
            reminder_interval: UNAVAILABLE_REMINDER_INTERVAL,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_reminder_interval(mut self, interval: Duration) -> Self {
        self.reminder_interval = interval;
        self
    }

    pub(crate) fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// One scan: dispatch every candidate not seen yet. Returns the number dispatched.
    pub(crate) async fn tick(&mut self) -> usize {
        let candidates = match self.detector.detect(&self.config.watch_dir).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.report_unavailable(e);
                return 0;
            }
        };

        if self.last_unavailable_report.take().is_some() {
            info!(directory = ?self.config.watch_dir, "watch directory is available again");
        }

        let mut dispatched = 0;
        for path in candidates {
            // Insert before dispatch so an in-flight archive is never queued twice
            if !self.seen.insert(&path) {
                continue;
            }

            info!(?path, "discovered new archive");
            self.sink.emit(Event::Discovered { path: path.clone() });

            let job = ExtractionJob::new(
                path,
                &self.config.extract_root,
                self.config.delete_after_extract,
            );
            self.pool.dispatch(job);
            dispatched += 1;
        }

        debug!(dispatched, seen = self.seen.len(), "scan complete");
        dispatched
    }

    fn report_unavailable(&mut self, error: ExtractionError) {
        let (path, reason) = match error {
            ExtractionError::DirectoryUnavailable { path, reason } => (path, reason),
            other => (self.config.watch_dir.clone(), other.to_string()),
        };

        match self.last_unavailable_report {
            None => {
                warn!(?path, %reason, "watch directory unavailable, will retry on next scan");
            }
            Some(reported) if reported.elapsed() >= self.reminder_interval => {
                warn!(?path, %reason, "watch directory still unavailable");
            }
            Some(_) => {
                debug!(?path, %reason, "watch directory still unavailable");
                return;
            }
        }
        self.last_unavailable_report = Some(Instant::now());
        self.sink.emit(Event::DirectoryUnavailable { path, reason });
    }

    /// Scan until `cancel` fires, sleeping `poll_interval` between scans
    ///
    /// Cancellation is honoured while listing the directory and while sleeping. Moves the
    /// shared state to `Stopping` on the way out.
    pub(crate) async fn run(
        mut self,
        cancel: CancellationToken,
        state: Arc<watch::Sender<WatcherState>>,
    ) {
        info!(
            directory = ?self.config.watch_dir,
            interval_secs = self.config.poll_interval.as_secs(),
            "scan loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        state.send_replace(WatcherState::Stopping);
        info!(
            directory = ?self.config.watch_dir,
            seen = self.seen.len(),
            "scan loop exiting"
        );
    }
}
