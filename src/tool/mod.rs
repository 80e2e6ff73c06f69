//! External archiver invocation
//!
//! Archive formats are never parsed here. Extraction is delegated to an external
//! 7-Zip compatible binary behind the [`ExtractionTool`] trait:
//!
//! - [`SevenZipCli`]: runs the binary as a subprocess and captures its output
//! - [`MissingTool`]: stand-in that reports [`ToolUnavailable`](crate::error::ExtractionError::ToolUnavailable)
//!   for every archive when no binary is available
//!
//! [`resolve_tool`] picks one from a [`ToolsConfig`].

mod cli;
mod missing;
mod traits;

pub use cli::SevenZipCli;
pub use missing::MissingTool;
pub use traits::{ExtractionTool, ToolOutput};

use crate::config::ToolsConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Choose the archiver for a configuration
///
/// An explicit `sevenzip_path` always wins, even if it does not exist yet; a bad path
/// then surfaces as `ToolUnavailable` on each job. Otherwise PATH is searched when
/// `search_path` is set. Falls back to [`MissingTool`].
pub fn resolve_tool(config: &ToolsConfig) -> Arc<dyn ExtractionTool> {
    if let Some(path) = &config.sevenzip_path {
        info!(binary = ?path, "using configured archiver");
        return Arc::new(SevenZipCli::new(path.clone()));
    }

    if config.search_path
        && let Some(tool) = SevenZipCli::from_path()
    {
        info!(binary = ?tool.binary_path(), "found archiver in PATH");
        return Arc::new(tool);
    }

    warn!("no 7-Zip binary available, every extraction will fail until one is configured");
    Arc::new(MissingTool::new("7z"))
}
