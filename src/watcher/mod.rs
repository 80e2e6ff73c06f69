//! Directory watching and extraction scheduling
//!
//! The [`Watcher`] owns the scan loop of the current watch session and the bookkeeping
//! shared by all sessions. Lifecycle:
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopping --> Stopped
//! ```
//!
//! Polling is used instead of filesystem notifications: archives that are still being
//! downloaded show up long before they are complete, and treating "new" as "not seen in
//! this session" needs no ordering guarantees from the OS.
//!
//! # Example
//!
//! ```no_run
//! use auto_unpack::{Config, EventBus, Watcher};
//! use std::sync::Arc;
//!
//! # async fn example() -> auto_unpack::Result<()> {
//! let bus = EventBus::new();
//! let mut events = bus.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(record) = events.recv().await {
//!         println!("{record}");
//!     }
//! });
//!
//! let watcher = Watcher::new(Config::new("/home/me/Downloads"), Arc::new(bus));
//! watcher.start().await?;
//! // ...
//! watcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod poll;

pub use poll::SeenSet;
pub(crate) use poll::PollLoop;

use crate::config::{Config, WatchConfig};
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::tool::{ExtractionTool, resolve_tool};
use crate::types::{Event, WatchStats, WatcherState};
use crate::worker::{
    DestinationLocks, ExtractionPool, ExtractionWorker, StatsCounters, ensure_destination,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Handles of the running session
///
/// Dropping a session cancels its scan loop, so a watcher dropped while running stops
/// discovering archives.
struct Session {
    config: Arc<WatchConfig>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _cancel_on_drop: DropGuard,
}

struct Inner {
    config: Config,
    session: Option<Session>,
}

/// Watches one directory and extracts every new archive found in it
pub struct Watcher {
    inner: Mutex<Inner>,
    tool_override: Option<Arc<dyn ExtractionTool>>,
    sink: Arc<dyn EventSink>,
    state: Arc<watch::Sender<WatcherState>>,
    /// Extraction tasks from every session, for bounded shutdown
    tracker: TaskTracker,
    stats: Arc<StatsCounters>,
    destinations: Arc<DestinationLocks>,
    accepting: AtomicBool,
}

impl Watcher {
    /// Create a stopped watcher
    ///
    /// The archiver is resolved from `config.tools` each time a session starts.
    pub fn new(config: Config, sink: Arc<dyn EventSink>) -> Self {
        Self::build(config, None, sink)
    }

    /// Create a stopped watcher that always uses `tool`
    pub fn with_tool(
        config: Config,
        tool: Arc<dyn ExtractionTool>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::build(config, Some(tool), sink)
    }

    fn build(
        config: Config,
        tool_override: Option<Arc<dyn ExtractionTool>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (state, _rx) = watch::channel(WatcherState::Stopped);
        Self {
            inner: Mutex::new(Inner {
                config,
                session: None,
            }),
            tool_override,
            sink,
            state: Arc::new(state),
            tracker: TaskTracker::new(),
            stats: Arc::new(StatsCounters::default()),
            destinations: Arc::new(DestinationLocks::default()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Counters across all sessions of this watcher
    pub fn stats(&self) -> WatchStats {
        self.stats.snapshot()
    }

    /// Number of extractions dispatched and not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Copy of the configuration used for the next (or current) session
    pub async fn config(&self) -> Config {
        self.inner.lock().await.config.clone()
    }

    /// Replace the configuration
    ///
    /// # Errors
    /// [`Error::AlreadyRunning`] while a session is active: stop first, then reconfigure.
    pub async fn set_config(&self, config: Config) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_some() {
            return Err(Error::AlreadyRunning);
        }
        inner.config = config;
        Ok(())
    }

    /// Start a watch session
    ///
    /// Validates the configuration, creates the extract root and spawns the scan loop
    /// with an empty [`SeenSet`]. The first scan happens immediately.
    ///
    /// # Errors
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`Error::AlreadyRunning`] unless the watcher is stopped
    /// - [`Error::Config`] if the configuration is invalid
    pub async fn start(&self) -> Result<()> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut inner = self.inner.lock().await;
        if inner.session.is_some() || self.state() != WatcherState::Stopped {
            return Err(Error::AlreadyRunning);
        }

        let config = Arc::new(inner.config.validate()?);

        if let Err(e) = ensure_destination(&config.extract_root).await {
            warn!(extract_root = ?config.extract_root, error = %e, "failed to create extract root");
            self.sink.emit(Event::DirectoryUnavailable {
                path: config.extract_root.clone(),
                reason: e.to_string(),
            });
        }

        let tool = match &self.tool_override {
            Some(tool) => Arc::clone(tool),
            None => resolve_tool(&inner.config.tools),
        };
        let worker = Arc::new(ExtractionWorker::new(tool, Arc::clone(&self.sink)));
        let pool = ExtractionPool::with_shared(
            worker,
            Arc::clone(&self.sink),
            config.max_concurrent_extractions,
            self.tracker.clone(),
            Arc::clone(&self.stats),
            Arc::clone(&self.destinations),
        );
        let scan = PollLoop::new(Arc::clone(&config), pool, Arc::clone(&self.sink));

        info!(
            watch_dir = ?config.watch_dir,
            extract_root = ?config.extract_root,
            extensions = ?config.extensions,
            "starting watch session"
        );
        self.state.send_replace(WatcherState::Running);
        self.sink.emit(Event::WatchStarted {
            directory: config.watch_dir.clone(),
            extract_root: config.extract_root.clone(),
        });

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scan.run(cancel.clone(), Arc::clone(&self.state)));

        inner.session = Some(Session {
            config,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            handle,
        });
        Ok(())
    }

    /// Stop the current watch session
    ///
    /// Does nothing when already stopped. Otherwise signals the scan loop and waits for
    /// it to exit, at most `stop_timeout`; past that the loop task is aborted and an
    /// `Anomaly` event is emitted. Extractions already dispatched keep running.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let Some(mut session) = inner.session.take() else {
            debug!("stop requested while already stopped");
            return;
        };

        info!(watch_dir = ?session.config.watch_dir, "stopping watch session");
        self.state.send_replace(WatcherState::Stopping);
        session.cancel.cancel();

        match tokio::time::timeout(session.config.stop_timeout, &mut session.handle).await {
            Ok(Ok(())) => debug!("scan loop exited"),
            Ok(Err(e)) => error!(error = %e, "scan loop task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = session.config.stop_timeout.as_secs_f64(),
                    "scan loop did not exit in time, aborting it"
                );
                session.handle.abort();
                self.sink.emit(Event::Anomaly {
                    message: format!(
                        "scan loop did not stop within {:?}; aborted",
                        session.config.stop_timeout
                    ),
                });
            }
        }

        self.state.send_replace(WatcherState::Stopped);
        self.sink.emit(Event::WatchStopped {
            directory: session.config.watch_dir.clone(),
        });
    }

    /// Stop watching and wait for in-flight extractions
    ///
    /// Waits at most `shutdown_timeout`. Extractions still running after that are
    /// abandoned, not killed; an `Anomaly` event reports how many. Emits `Shutdown`.
    /// The watcher refuses to start again afterwards. Concurrent calls each wait on the
    /// same set of extractions.
    pub async fn shutdown(&self) {
        info!("initiating graceful shutdown");
        self.accepting.store(false, Ordering::SeqCst);
        self.stop().await;

        let timeout = self.inner.lock().await.config.shutdown_timeout;
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, "waiting for {} extraction(s) to finish", pending);
        }

        // No session can start any more, so the tracker stays closed
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            info!("all extractions finished");
        } else {
            let abandoned = self.tracker.len();
            warn!(abandoned, "timeout waiting for extractions, proceeding with shutdown");
            self.sink.emit(Event::Anomaly {
                message: format!(
                    "shutdown timed out after {timeout:?}; abandoning {abandoned} running extraction(s)"
                ),
            });
        }

        self.sink.emit(Event::Shutdown);
        info!("graceful shutdown complete");
    }
}
