//! # auto-unpack
//!
//! Watches a directory for newly arrived archives and extracts each one into its own
//! folder using an external 7-Zip binary, optionally deleting the source afterwards.
//!
//! ## Design Philosophy
//!
//! - **Poll, don't subscribe** - a fixed-interval scan plus a per-session "seen" set
//!   tolerates archives that are still being written
//! - **Never block detection** - each archive is extracted in its own task, with a cap on
//!   how many run at once
//! - **Failures are events** - a missing directory, a missing archiver or a corrupt
//!   archive becomes an event for the observer; the watch loop keeps running
//! - **UI-agnostic** - consumers receive typed events through [`EventSink`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use auto_unpack::{Config, EventBus, Watcher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         delete_after_extract: true,
//!         ..Config::new("/home/me/Downloads")
//!     };
//!
//!     let bus = EventBus::new();
//!     let mut events = bus.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(record) = events.recv().await {
//!             println!("{record}");
//!         }
//!     });
//!
//!     let watcher = Watcher::new(config, Arc::new(bus));
//!     watcher.start().await?;
//!
//!     // Stop on Ctrl+C, waiting for running extractions
//!     auto_unpack::run_with_shutdown(&watcher).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Archive detection
pub mod detector;
/// Error types
pub mod error;
/// Event delivery
pub mod events;
/// External archiver invocation
pub mod tool;
/// Core types and events
pub mod types;
/// Directory watching and scheduling
pub mod watcher;
/// Extraction workers
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ToolsConfig, WatchConfig};
pub use detector::ArchiveDetector;
pub use error::{Error, ExtractionError, Result};
pub use events::{EventBus, EventRecord, EventSink};
pub use tool::{ExtractionTool, MissingTool, SevenZipCli, ToolOutput, resolve_tool};
pub use types::{Event, ExtractionJob, ExtractionOutcome, WatchStats, WatcherState};
pub use watcher::{SeenSet, Watcher};
pub use worker::{ExtractionPool, ExtractionWorker};

/// Wait for SIGINT (Ctrl+C) or, on Unix, SIGTERM, then shut the watcher down gracefully
pub async fn run_with_shutdown(watcher: &Watcher) {
    wait_for_signal().await;
    watcher.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("received Ctrl+C"),
            Err(e) => {
                tracing::warn!(error = %e, "Ctrl+C handler unavailable, waiting for SIGTERM only");
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            }
        },
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "cannot listen for Ctrl+C, shutting down now"),
    }
}
