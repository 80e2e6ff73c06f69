//! Extraction workers
//!
//! An [`ExtractionWorker`] turns one [`ExtractionJob`] into exactly one
//! [`ExtractionOutcome`]. [`ExtractionPool`] runs workers as independent tasks with a
//! concurrency cap, so a slow archive never delays detection of the next one.

mod pool;

pub use pool::ExtractionPool;
pub(crate) use pool::{DestinationLocks, StatsCounters};

use crate::error::ExtractionError;
use crate::events::EventSink;
use crate::tool::ExtractionTool;
use crate::types::{Event, ExtractionJob, ExtractionOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Destination directory for an archive: `<extract_root>/<file stem>`
///
/// `report.zip` maps to `<extract_root>/report`. A name without a stem falls back to
/// the full file name.
pub fn destination_for(extract_root: &Path, source: &Path) -> PathBuf {
    match source.file_stem().or_else(|| source.file_name()) {
        Some(stem) => extract_root.join(stem),
        None => extract_root.join("archive"),
    }
}

/// Create `path` and any missing parents
///
/// Succeeds without touching anything when the directory already exists.
pub async fn ensure_destination(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// Runs the archiver for one job at a time
pub struct ExtractionWorker {
    tool: Arc<dyn ExtractionTool>,
    sink: Arc<dyn EventSink>,
}

impl ExtractionWorker {
    /// Create a worker that extracts with `tool` and reports to `sink`
    pub fn new(tool: Arc<dyn ExtractionTool>, sink: Arc<dyn EventSink>) -> Self {
        Self { tool, sink }
    }

    /// Process one job
    ///
    /// 1. emits `ExtractionStarted`
    /// 2. creates the destination directory
    /// 3. runs the archiver
    /// 4. on success, deletes the source if the job asks for it
    ///
    /// Never fails: every problem is recorded in the returned outcome. The caller emits
    /// the `ExtractionFinished` event.
    pub async fn extract(&self, job: ExtractionJob) -> ExtractionOutcome {
        info!(
            source = ?job.source,
            destination = ?job.destination,
            "extracting archive"
        );
        self.sink.emit(Event::ExtractionStarted {
            source: job.source.clone(),
            destination: job.destination.clone(),
        });

        if let Err(e) = ensure_destination(&job.destination).await {
            warn!(destination = ?job.destination, error = %e, "failed to create destination");
            return ExtractionOutcome::failed(
                &job,
                ExtractionError::DirectoryUnavailable {
                    path: job.destination.clone(),
                    reason: e.to_string(),
                },
            );
        }

        let output = match self.tool.run(&job.source, &job.destination).await {
            Ok(output) => output,
            Err(e) => {
                warn!(source = ?job.source, tool = self.tool.name(), error = %e, "archiver unavailable");
                return ExtractionOutcome::failed(&job, e);
            }
        };

        if !output.success() {
            let diagnostic = output.diagnostic();
            warn!(
                source = ?job.source,
                exit_code = ?output.exit_code,
                %diagnostic,
                "archiver reported failure"
            );
            return ExtractionOutcome::failed(
                &job,
                ExtractionError::ExtractionFailed {
                    archive: job.source.clone(),
                    exit_code: output.exit_code,
                    diagnostic,
                },
            );
        }

        let mut outcome = ExtractionOutcome::succeeded(&job, output.diagnostic());
        info!(source = ?job.source, destination = ?job.destination, "extraction successful");

        if job.delete_after {
            match tokio::fs::remove_file(&job.source).await {
                Ok(()) => {
                    debug!(source = ?job.source, "deleted source archive");
                    outcome.source_removed = true;
                }
                Err(e) => {
                    warn!(source = ?job.source, error = %e, "failed to delete source archive");
                    outcome.cleanup_error = Some(ExtractionError::DeletionFailed {
                        archive: job.source.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
