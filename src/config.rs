//! Configuration types for auto-unpack
//!
//! [`Config`] is the user-facing, serde-friendly settings struct. It is validated once,
//! when a watch session starts, into a [`WatchConfig`]: an immutable snapshot with
//! absolute paths and normalized extension suffixes that the watcher and workers share.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Largest accepted poll interval
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Name of the extraction root created inside the watch directory by default
pub const DEFAULT_EXTRACT_DIR_NAME: &str = "Extracted";

/// Watch-and-extract configuration
///
/// All fields have defaults, so an empty JSON object is a valid configuration that
/// watches `~/Downloads` and extracts into `~/Downloads/Extracted`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for new archives (default: "~/Downloads")
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Root under which each archive gets its own folder (default: "<watch_dir>/Extracted")
    #[serde(default)]
    pub extract_root: Option<PathBuf>,

    /// File name suffixes treated as archives, matched case-insensitively
    /// (default: ".zip", ".rar", ".7z")
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Time between directory scans (default: 10 seconds, allowed 1-3600)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Remove the source archive after a successful extraction (default: false)
    #[serde(default)]
    pub delete_after_extract: bool,

    /// Maximum number of extractions running at the same time (default: 2)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_extractions: usize,

    /// How long `stop()` waits for the scan loop to exit (default: 5 seconds)
    #[serde(default = "default_stop_timeout", with = "duration_serde")]
    pub stop_timeout: Duration,

    /// How long `shutdown()` waits for in-flight extractions (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// External archiver settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            extract_root: None,
            extensions: default_extensions(),
            poll_interval: default_poll_interval(),
            delete_after_extract: false,
            max_concurrent_extractions: default_max_concurrent(),
            stop_timeout: default_stop_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            tools: ToolsConfig::default(),
        }
    }
}

/// External archiver location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Whether to search PATH for the archiver if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sevenzip_path: None,
            search_path: true,
        }
    }
}

impl Config {
    /// Create a configuration watching `watch_dir` with every other setting at its default
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Extraction root after applying the default (`<watch_dir>/Extracted`)
    pub fn effective_extract_root(&self) -> PathBuf {
        match &self.extract_root {
            Some(root) => root.clone(),
            None => self.watch_dir.join(DEFAULT_EXTRACT_DIR_NAME),
        }
    }

    /// Validate the configuration and freeze it into a [`WatchConfig`]
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key when:
    /// - `watch_dir` is empty
    /// - `extensions` is empty or contains only blank entries
    /// - `poll_interval` is outside 1-3600 seconds
    /// - `max_concurrent_extractions` is zero
    pub fn validate(&self) -> Result<WatchConfig> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(Error::config("watch_dir", "watch directory must not be empty"));
        }

        if let Some(root) = &self.extract_root
            && root.as_os_str().is_empty()
        {
            return Err(Error::config(
                "extract_root",
                "extract root must not be empty when set",
            ));
        }

        let extensions = normalize_extensions(&self.extensions)?;

        if self.poll_interval < MIN_POLL_INTERVAL || self.poll_interval > MAX_POLL_INTERVAL {
            return Err(Error::config(
                "poll_interval",
                format!(
                    "poll interval must be between {} and {} seconds, got {:?}",
                    MIN_POLL_INTERVAL.as_secs(),
                    MAX_POLL_INTERVAL.as_secs(),
                    self.poll_interval
                ),
            ));
        }

        if self.max_concurrent_extractions == 0 {
            return Err(Error::config(
                "max_concurrent_extractions",
                "at least one concurrent extraction is required",
            ));
        }

        let watch_dir = std::path::absolute(&self.watch_dir)?;
        let extract_root = std::path::absolute(self.effective_extract_root())?;

        Ok(WatchConfig {
            watch_dir,
            extract_root,
            extensions,
            poll_interval: self.poll_interval,
            delete_after_extract: self.delete_after_extract,
            max_concurrent_extractions: self.max_concurrent_extractions,
            stop_timeout: self.stop_timeout,
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

/// Validated, immutable settings for one watch session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    /// Absolute path of the watched directory
    pub watch_dir: PathBuf,
    /// Absolute path of the extraction root
    pub extract_root: PathBuf,
    /// Lower-cased suffixes with a leading dot, in configuration order, without duplicates
    pub extensions: Vec<String>,
    /// Time between directory scans
    pub poll_interval: Duration,
    /// Remove source archives after successful extraction
    pub delete_after_extract: bool,
    /// Concurrency cap for extractions
    pub max_concurrent_extractions: usize,
    /// Bound on how long `stop()` waits for the scan loop
    pub stop_timeout: Duration,
    /// Bound on how long `shutdown()` waits for in-flight extractions
    pub shutdown_timeout: Duration,
}

/// Lower-case each suffix, add a leading dot and drop duplicates while keeping order
fn normalize_extensions(raw: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(raw.len());

    for ext in raw {
        let trimmed = ext.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            continue;
        }
        let suffix = format!(".{}", trimmed.to_lowercase());
        if !normalized.contains(&suffix) {
            normalized.push(suffix);
        }
    }

    if normalized.is_empty() {
        return Err(Error::config(
            "extensions",
            "at least one archive extension is required",
        ));
    }

    Ok(normalized)
}

fn default_watch_dir() -> PathBuf {
    match home::home_dir() {
        Some(home) => home.join("Downloads"),
        None => PathBuf::from("./downloads"),
    }
}

fn default_extensions() -> Vec<String> {
    vec![".zip".into(), ".rar".into(), ".7z".into()]
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_concurrent() -> usize {
    2
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_key(err: &Error) -> Option<&str> {
        match err {
            Error::Config { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.extensions, vec![".zip", ".rar", ".7z"]);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(!config.delete_after_extract);
        assert_eq!(config.max_concurrent_extractions, 2);
        assert!(config.tools.search_path);
        assert!(config.tools.sevenzip_path.is_none());
        assert!(config.watch_dir.ends_with("Downloads") || config.watch_dir.ends_with("downloads"));
    }

    #[test]
    fn extract_root_defaults_under_watch_dir() {
        let config = Config::new("/data/incoming");
        assert_eq!(
            config.effective_extract_root(),
            PathBuf::from("/data/incoming/Extracted")
        );

        let config = Config {
            extract_root: Some("/data/out".into()),
            ..Config::new("/data/incoming")
        };
        assert_eq!(config.effective_extract_root(), PathBuf::from("/data/out"));
    }

    #[test]
    fn validate_normalizes_extensions() {
        let config = Config {
            extensions: vec![
                "ZIP".into(),
                ".Rar".into(),
                " .7z ".into(),
                ".zip".into(),
                "".into(),
            ],
            ..Config::new("/data/incoming")
        };
        let watch = config.validate().unwrap();
        assert_eq!(watch.extensions, vec![".zip", ".rar", ".7z"]);
    }

    #[test]
    fn validate_makes_paths_absolute() {
        let watch = Config::new("relative/dir").validate().unwrap();
        assert!(watch.watch_dir.is_absolute());
        assert!(watch.extract_root.is_absolute());
        assert!(watch.extract_root.ends_with("relative/dir/Extracted"));
    }

    #[test]
    fn validate_rejects_empty_extensions() {
        let config = Config {
            extensions: vec![" ".into(), ".".into()],
            ..Config::new("/data/incoming")
        };
        let err = config.validate().unwrap_err();
        assert_eq!(config_key(&err), Some("extensions"));
    }

    #[test]
    fn validate_rejects_out_of_range_interval() {
        for interval in [Duration::ZERO, Duration::from_millis(500), Duration::from_secs(3601)] {
            let config = Config {
                poll_interval: interval,
                ..Config::new("/data/incoming")
            };
            let err = config.validate().unwrap_err();
            assert_eq!(config_key(&err), Some("poll_interval"), "{interval:?}");
        }

        for interval in [Duration::from_secs(1), Duration::from_secs(3600)] {
            let config = Config {
                poll_interval: interval,
                ..Config::new("/data/incoming")
            };
            assert!(config.validate().is_ok(), "{interval:?} should be accepted");
        }
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent_extractions: 0,
            ..Config::new("/data/incoming")
        };
        let err = config.validate().unwrap_err();
        assert_eq!(config_key(&err), Some("max_concurrent_extractions"));
    }

    #[test]
    fn validate_rejects_empty_watch_dir() {
        let err = Config::new("").validate().unwrap_err();
        assert_eq!(config_key(&err), Some("watch_dir"));
    }

    #[test]
    fn empty_json_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.extensions, Config::default().extensions);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let config = Config {
            poll_interval: Duration::from_secs(42),
            ..Config::new("/data/incoming")
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["poll_interval"], 42);
        assert_eq!(json["shutdown_timeout"], 30);
    }

    #[test]
    fn duration_rejects_string_value() {
        let result: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"poll_interval": "10s"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn from_json_file_reads_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auto-unpack.json");
        std::fs::write(
            &path,
            r#"{
                "watch_dir": "/srv/inbox",
                "extensions": [".tar.gz"],
                "poll_interval": 3,
                "delete_after_extract": true,
                "tools": { "sevenzip_path": "/opt/7zip/7zz" }
            }"#,
        )
        .unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.watch_dir, PathBuf::from("/srv/inbox"));
        assert_eq!(config.extensions, vec![".tar.gz"]);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert!(config.delete_after_extract);
        assert_eq!(
            config.tools.sevenzip_path,
            Some(PathBuf::from("/opt/7zip/7zz"))
        );
        assert!(config.tools.search_path);
    }

    #[test]
    fn from_json_file_reports_missing_file_as_io() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn from_json_file_reports_bad_json_as_serialization() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
