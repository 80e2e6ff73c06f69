//! Scratch directories and stand-in archiver scripts

use auto_unpack::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Archiver that writes `contents.txt` into the `-o` directory and exits 0
pub const SUCCEEDING_ARCHIVER: &str = r#"#!/bin/sh
dest="${3#-o}"
echo "extracted from $(basename "$2")" > "$dest/contents.txt"
echo "Everything is Ok"
exit 0
"#;

/// Archiver that rejects every archive like 7z does for unknown formats
pub const FAILING_ARCHIVER: &str = r#"#!/bin/sh
echo "unsupported format" >&2
exit 2
"#;

/// Archiver that succeeds but removes the archive itself, so a later delete fails
pub const SELF_DELETING_ARCHIVER: &str = r#"#!/bin/sh
dest="${3#-o}"
rm -f "$2"
echo "done" > "$dest/contents.txt"
exit 0
"#;

/// Archiver that records its arguments, one per line, into the destination
pub const ARG_RECORDING_ARCHIVER: &str = r#"#!/bin/sh
dest="${3#-o}"
printf '%s\n' "$@" > "$dest/args.txt"
exit 0
"#;

/// Temporary layout: `downloads/` (watched), `extracted/` (root), `bin/` (archivers)
pub struct Workspace {
    pub dir: TempDir,
    pub downloads: PathBuf,
    pub extracted: PathBuf,
    pub bin: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let downloads = dir.path().join("downloads");
        let extracted = dir.path().join("extracted");
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(&bin).unwrap();
        Self {
            dir,
            downloads,
            extracted,
            bin,
        }
    }

    /// Place a file with archive-like content in the watched directory
    pub fn drop_archive(&self, name: &str) -> PathBuf {
        let path = self.downloads.join(name);
        std::fs::write(&path, b"PK\x03\x04 not really an archive").unwrap();
        path
    }

    /// Configuration watching `downloads/` with a short interval
    pub fn config(&self) -> Config {
        Config {
            extract_root: Some(self.extracted.clone()),
            poll_interval: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(10),
            ..Config::new(&self.downloads)
        }
    }

    /// Install an executable shell script and return its path
    #[cfg(unix)]
    pub fn install_archiver(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.bin.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Path of the destination folder for `archive` under `root`
pub fn destination(root: &Path, archive: &str) -> PathBuf {
    let stem = Path::new(archive).file_stem().unwrap();
    root.join(stem)
}
