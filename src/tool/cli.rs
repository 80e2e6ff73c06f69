//! 7-Zip command-line archiver

use super::traits::{ExtractionTool, ToolOutput};
use crate::error::ExtractionError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Binary names probed in PATH, in order
const SEVENZIP_BINARIES: &[&str] = &["7z", "7zz", "7za"];

/// Default install location of 7-Zip on Windows
#[cfg(windows)]
const WINDOWS_DEFAULT_PATH: &str = r"C:\Program Files\7-Zip\7z.exe";

/// Extraction through an external 7-Zip compatible binary
///
/// Runs `<binary> x <archive> -o<destination> -y`: extract with full paths, into the
/// destination, answering yes to every overwrite prompt. Standard input is closed so
/// the archiver can never block waiting for a password.
///
/// # Examples
///
/// ```no_run
/// use auto_unpack::tool::SevenZipCli;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let tool = SevenZipCli::new(PathBuf::from("/usr/bin/7z"));
///
/// // Or auto-discover from PATH
/// let tool = SevenZipCli::from_path().expect("7z not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct SevenZipCli {
    binary_path: PathBuf,
}

impl SevenZipCli {
    /// Create a new CLI tool with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find a 7-Zip binary in PATH
    ///
    /// Tries `7z`, `7zz` and `7za` via the `which` crate. On Windows the default
    /// install location is checked as a last resort.
    pub fn from_path() -> Option<Self> {
        if let Some(found) = SEVENZIP_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
        {
            return Some(Self::new(found));
        }

        #[cfg(windows)]
        {
            let default = PathBuf::from(WINDOWS_DEFAULT_PATH);
            if default.is_file() {
                return Some(Self::new(default));
            }
        }

        None
    }

    /// Path of the binary that will be executed
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments passed to the binary for one extraction
    pub fn command_args(archive: &Path, destination: &Path) -> Vec<OsString> {
        let mut output_flag = OsString::from("-o");
        output_flag.push(destination.as_os_str());

        vec![
            OsString::from("x"),
            archive.as_os_str().to_os_string(),
            output_flag,
            OsString::from("-y"),
        ]
    }
}

#[async_trait]
impl ExtractionTool for SevenZipCli {
    async fn run(
        &self,
        archive: &Path,
        destination: &Path,
    ) -> Result<ToolOutput, ExtractionError> {
        debug!(
            binary = ?self.binary_path,
            ?archive,
            ?destination,
            "running archiver"
        );

        let output = Command::new(&self.binary_path)
            .args(Self::command_args(archive, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExtractionError::ToolUnavailable {
                tool: self.binary_path.clone(),
                reason: format!("failed to execute archiver: {e}"),
            })?;

        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            ?archive,
            exit_code = ?result.exit_code,
            "archiver finished"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "cli-7z"
    }
}
