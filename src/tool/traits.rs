//! Traits and types for external archivers

use crate::error::ExtractionError;
use async_trait::async_trait;
use std::path::Path;

/// Exit status and captured output of one archiver run
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the archiver exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Diagnostic text for logs: trimmed stderr, or trimmed stdout when stderr is empty
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Trait for extracting one archive into one directory
///
/// `run` returns `Ok` whenever the archiver actually ran, whatever its exit status;
/// interpreting the status is up to the caller. `Err` is reserved for
/// [`ExtractionError::ToolUnavailable`]: the archiver could not be launched at all.
///
/// # Examples
///
/// ```no_run
/// use auto_unpack::tool::{ExtractionTool, SevenZipCli};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = SevenZipCli::from_path().expect("7z not found in PATH");
/// let output = tool
///     .run(Path::new("report.zip"), Path::new("Extracted/report"))
///     .await?;
/// if !output.success() {
///     eprintln!("7z failed: {}", output.diagnostic());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ExtractionTool: Send + Sync {
    /// Extract `archive` into `destination`, overwriting existing files without prompting
    async fn run(&self, archive: &Path, destination: &Path)
    -> Result<ToolOutput, ExtractionError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
