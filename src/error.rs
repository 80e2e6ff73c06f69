//! Error types for auto-unpack
//!
//! Two layers of errors are used:
//! - [`Error`] is returned synchronously from the public API (invalid configuration,
//!   starting a watcher twice, I/O while loading a config file).
//! - [`ExtractionError`] describes failures on the watch-and-extract path. These never
//!   propagate as faults; they are recovered where they occur and carried inside
//!   [`Event`](crate::types::Event)s and [`ExtractionOutcome`](crate::types::ExtractionOutcome)s.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for auto-unpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for auto-unpack
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll_interval")
        key: Option<String>,
    },

    /// `start()` was called while a watch session is active
    #[error("watcher is already running")]
    AlreadyRunning,

    /// Shutdown in progress - not accepting new watch sessions
    #[error("shutdown in progress: not accepting new watch sessions")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Config`] for the given configuration key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Recoverable failures on the watch-and-extract path
///
/// Unlike [`Error`], these are values: the detector returns them, workers store them in
/// outcomes and the watcher forwards them to the event sink. `Clone` and `Serialize` so
/// they can travel through the broadcast event channel.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// Watched directory or extraction destination is missing or unreadable
    #[error("directory unavailable: {}: {reason}", .path.display())]
    DirectoryUnavailable {
        /// The directory that could not be used
        path: PathBuf,
        /// Underlying OS error text
        reason: String,
    },

    /// The archiver executable is missing or could not be launched
    #[error("extraction tool unavailable ({}): {reason}", .tool.display())]
    ToolUnavailable {
        /// Path or name of the archiver binary
        tool: PathBuf,
        /// Why launching failed
        reason: String,
    },

    /// The archiver ran but returned a non-zero exit status
    #[error("extraction failed for {} (exit code {}): {diagnostic}", .archive.display(), exit_code_text(.exit_code))]
    ExtractionFailed {
        /// Archive being extracted
        archive: PathBuf,
        /// Exit code, `None` if the process was terminated by a signal
        exit_code: Option<i32>,
        /// Captured stderr (or stdout) of the archiver
        diagnostic: String,
    },

    /// Extraction succeeded but the source archive could not be removed afterwards
    #[error("failed to delete {}: {reason}", .archive.display())]
    DeletionFailed {
        /// Archive that should have been removed
        archive: PathBuf,
        /// Underlying OS error text
        reason: String,
    },
}

impl ExtractionError {
    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::DirectoryUnavailable { .. } => "directory_unavailable",
            ExtractionError::ToolUnavailable { .. } => "tool_unavailable",
            ExtractionError::ExtractionFailed { .. } => "extraction_failed",
            ExtractionError::DeletionFailed { .. } => "deletion_failed",
        }
    }
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}
