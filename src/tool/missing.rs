//! Placeholder used when no archiver binary is available

use super::traits::{ExtractionTool, ToolOutput};
use crate::error::ExtractionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Archiver stand-in used when no 7-Zip binary is configured or found
///
/// Every run fails with [`ExtractionError::ToolUnavailable`], so a missing archiver
/// shows up as one failed outcome per archive instead of stopping the watcher.
///
/// # Examples
///
/// ```
/// use auto_unpack::tool::{ExtractionTool, MissingTool};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let tool = MissingTool::new("7z");
/// let result = tool.run(Path::new("report.zip"), Path::new("out")).await;
/// assert!(result.is_err());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MissingTool {
    wanted: PathBuf,
}

impl MissingTool {
    /// `wanted` names the binary that could not be found, for error messages
    pub fn new(wanted: impl Into<PathBuf>) -> Self {
        Self {
            wanted: wanted.into(),
        }
    }
}

#[async_trait]
impl ExtractionTool for MissingTool {
    async fn run(
        &self,
        _archive: &Path,
        _destination: &Path,
    ) -> Result<ToolOutput, ExtractionError> {
        Err(ExtractionError::ToolUnavailable {
            tool: self.wanted.clone(),
            reason: "no 7-Zip binary found. \
                     Configure tools.sevenzip_path or ensure 7z is in PATH."
                .into(),
        })
    }

    fn name(&self) -> &'static str {
        "missing"
    }
}
