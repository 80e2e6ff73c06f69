//! `auto-unpack` command-line entry point
//!
//! Builds a [`Config`] from an optional JSON file plus flags, prints every pipeline
//! event as a timestamped line and runs until SIGINT/SIGTERM.

use auto_unpack::{Config, EventBus, Watcher};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Watch a directory and extract every new archive with 7-Zip
#[derive(Debug, Parser)]
#[command(name = "auto-unpack", version, about)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to watch (default: ~/Downloads)
    #[arg(short, long)]
    watch_dir: Option<PathBuf>,

    /// Root for extracted folders (default: <watch dir>/Extracted)
    #[arg(short, long)]
    extract_root: Option<PathBuf>,

    /// Archive suffix to pick up; repeat for several (default: .zip .rar .7z)
    #[arg(long = "ext", value_name = "SUFFIX")]
    extensions: Vec<String>,

    /// Seconds between scans (1-3600)
    #[arg(short, long, value_name = "SECS")]
    interval: Option<u64>,

    /// Delete each archive after it was extracted successfully
    #[arg(long)]
    delete_after: bool,

    /// Maximum extractions running at once
    #[arg(long, value_name = "N")]
    max_concurrent: Option<usize>,

    /// Path to the 7z binary (default: search PATH)
    #[arg(long, value_name = "PATH")]
    sevenzip: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> auto_unpack::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = self.watch_dir {
            config.watch_dir = dir;
        }
        if let Some(root) = self.extract_root {
            config.extract_root = Some(root);
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions;
        }
        if let Some(secs) = self.interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if self.delete_after {
            config.delete_after_extract = true;
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent_extractions = n;
        }
        if let Some(path) = self.sevenzip {
            config.tools.sevenzip_path = Some(path);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("auto_unpack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(record) => println!("{record}"),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("(skipped {skipped} events)");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let watcher = Watcher::new(config, Arc::new(bus));
    watcher.start().await?;

    auto_unpack::run_with_shutdown(&watcher).await;

    // Abandoned extractions may still hold a bus handle, so don't wait on the printer forever
    drop(watcher);
    if tokio::time::timeout(Duration::from_secs(1), printer)
        .await
        .is_err()
    {
        tracing::debug!("event printer still attached after shutdown");
    }
    Ok(())
}
