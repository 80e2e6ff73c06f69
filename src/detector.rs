//! Archive detection by file-name suffix
//!
//! The detector is stateless: every call to [`ArchiveDetector::detect`] lists the
//! directory from scratch. De-duplication is the watcher's job.

use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lists archive candidates in a directory
#[derive(Clone, Debug)]
pub struct ArchiveDetector {
    /// Lower-cased suffixes including the leading dot
    suffixes: Vec<String>,
}

impl ArchiveDetector {
    /// Create a detector for the given suffixes
    ///
    /// Suffixes are compared case-insensitively; a leading dot is added when missing.
    /// Use [`Config::validate`](crate::config::Config::validate) to reject an empty list
    /// before getting here.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| {
                let s = s.as_ref().trim().trim_start_matches('.').to_lowercase();
                format!(".{s}")
            })
            .filter(|s| s.len() > 1)
            .collect();
        Self { suffixes }
    }

    /// Suffixes this detector matches
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Whether `file_name` ends with one of the configured suffixes (case-insensitive)
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix))
    }

    /// List archive candidates directly inside `directory`
    ///
    /// Sub-directories are skipped, as are entries whose metadata cannot be read.
    /// Candidates are sorted by path.
    ///
    /// # Errors
    /// Returns [`ExtractionError::DirectoryUnavailable`] when the directory is missing or
    /// cannot be listed. Callers treat this as "nothing found this time".
    pub async fn detect(&self, directory: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let unavailable = |e: std::io::Error| ExtractionError::DirectoryUnavailable {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(directory).await.map_err(unavailable)?;
        let mut candidates = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    // A directory that vanishes mid-listing is reported like a missing one
                    return Err(unavailable(e));
                }
            };

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!(path = ?entry.path(), "skipping entry with non UTF-8 name");
                continue;
            };
            if !self.matches(name) {
                continue;
            }

            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => continue,
                Ok(_) => candidates.push(entry.path()),
                Err(e) => {
                    debug!(path = ?entry.path(), error = %e, "skipping unreadable entry");
                }
            }
        }

        candidates.sort();
        debug!(
            ?directory,
            count = candidates.len(),
            "found {} archive candidate(s)",
            candidates.len()
        );
        Ok(candidates)
    }
}
