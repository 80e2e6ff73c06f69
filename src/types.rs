//! Core types for auto-unpack

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One archive to extract
///
/// Created by the watcher for each newly discovered file and consumed by exactly one
/// [`ExtractionWorker`](crate::worker::ExtractionWorker).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    /// Archive to extract
    pub source: PathBuf,
    /// Directory the archive is extracted into
    pub destination: PathBuf,
    /// Remove `source` after a successful extraction
    pub delete_after: bool,
}

impl ExtractionJob {
    /// Build a job for `source`, deriving the destination as `<extract_root>/<file stem>`
    pub fn new(source: impl Into<PathBuf>, extract_root: &Path, delete_after: bool) -> Self {
        let source = source.into();
        let destination = crate::worker::destination_for(extract_root, &source);
        Self {
            source,
            destination,
            delete_after,
        }
    }
}

/// Terminal result of processing one [`ExtractionJob`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    /// Archive that was processed
    pub source: PathBuf,
    /// Directory it was (or would have been) extracted into
    pub destination: PathBuf,
    /// Whether the archive was extracted
    pub success: bool,
    /// Captured archiver output (stderr preferred, stdout otherwise)
    pub diagnostic: String,
    /// Why the extraction failed, `None` on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractionError>,
    /// Post-success cleanup problem; does not affect `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<ExtractionError>,
    /// Whether the source archive was deleted
    pub source_removed: bool,
}

impl ExtractionOutcome {
    /// Successful extraction
    pub fn succeeded(job: &ExtractionJob, diagnostic: String) -> Self {
        Self {
            source: job.source.clone(),
            destination: job.destination.clone(),
            success: true,
            diagnostic,
            error: None,
            cleanup_error: None,
            source_removed: false,
        }
    }

    /// Failed extraction; the diagnostic text is taken from the error when it carries one
    pub fn failed(job: &ExtractionJob, error: ExtractionError) -> Self {
        let diagnostic = match &error {
            ExtractionError::ExtractionFailed { diagnostic, .. } => diagnostic.clone(),
            other => other.to_string(),
        };
        Self {
            source: job.source.clone(),
            destination: job.destination.clone(),
            success: false,
            diagnostic,
            error: Some(error),
            cleanup_error: None,
            source_removed: false,
        }
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let name = display_name(&self.source);
        if self.success {
            let mut line = format!("Extracted {} -> {}", name, self.destination.display());
            if self.source_removed {
                line.push_str(" (source deleted)");
            }
            if let Some(cleanup) = &self.cleanup_error {
                line.push_str(&format!("; warning: {cleanup}"));
            }
            line
        } else {
            match &self.error {
                Some(error) => format!("Failed to extract {name}: {error}"),
                None => format!("Failed to extract {name}"),
            }
        }
    }
}

/// Lifecycle state of a [`Watcher`](crate::watcher::Watcher)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    /// No watch session is active
    Stopped,
    /// The scan loop is running
    Running,
    /// A stop was requested and the scan loop is winding down
    Stopping,
}

impl std::fmt::Display for WatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            WatcherState::Stopped => "stopped",
            WatcherState::Running => "running",
            WatcherState::Stopping => "stopping",
        };
        f.write_str(text)
    }
}

/// Event emitted by the watcher and extraction workers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A watch session started
    WatchStarted {
        /// Watched directory
        directory: PathBuf,
        /// Extraction root
        extract_root: PathBuf,
    },

    /// A watch session ended
    WatchStopped {
        /// Watched directory
        directory: PathBuf,
    },

    /// The watched directory or the extraction root could not be used
    DirectoryUnavailable {
        /// Directory path
        path: PathBuf,
        /// Underlying error text
        reason: String,
    },

    /// A new archive was found and queued for extraction
    Discovered {
        /// Archive path
        path: PathBuf,
    },

    /// A worker began extracting an archive
    ExtractionStarted {
        /// Archive path
        source: PathBuf,
        /// Destination directory
        destination: PathBuf,
    },

    /// A worker finished with an archive (successfully or not)
    ExtractionFinished {
        /// Terminal result
        outcome: ExtractionOutcome,
    },

    /// Something unexpected that did not stop the pipeline (timeouts, abandoned jobs)
    Anomaly {
        /// Description
        message: String,
    },

    /// Graceful shutdown completed
    Shutdown,
}

impl Event {
    /// Human readable log line for this event
    pub fn message(&self) -> String {
        match self {
            Event::WatchStarted {
                directory,
                extract_root,
            } => format!(
                "Watching {} (extracting into {})",
                directory.display(),
                extract_root.display()
            ),
            Event::WatchStopped { directory } => {
                format!("Stopped watching {}", directory.display())
            }
            Event::DirectoryUnavailable { path, reason } => {
                format!("Directory unavailable: {} ({reason})", path.display())
            }
            Event::Discovered { path } => format!("Found new archive: {}", display_name(path)),
            Event::ExtractionStarted {
                source,
                destination,
            } => format!(
                "Extracting: {} -> {}",
                source.display(),
                destination.display()
            ),
            Event::ExtractionFinished { outcome } => outcome.summary(),
            Event::Anomaly { message } => format!("Warning: {message}"),
            Event::Shutdown => "Shut down".to_string(),
        }
    }

    /// Whether this event reports a failure
    pub fn is_failure(&self) -> bool {
        match self {
            Event::DirectoryUnavailable { .. } | Event::Anomaly { .. } => true,
            Event::ExtractionFinished { outcome } => {
                !outcome.success || outcome.cleanup_error.is_some()
            }
            _ => false,
        }
    }
}

/// Counters kept across watch sessions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    /// Archives dispatched for extraction
    pub discovered: u64,
    /// Extractions currently running or waiting for a slot
    pub in_flight: u64,
    /// Successful extractions
    pub succeeded: u64,
    /// Failed extractions
    pub failed: u64,
    /// Successful extractions whose source could not be deleted
    pub cleanup_failures: u64,
}

fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}
