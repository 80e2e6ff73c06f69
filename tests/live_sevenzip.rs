//! Tests against a real 7-Zip binary
//!
//! These need `7z`, `7zz` or `7za` on PATH and are ignored by default.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --features live-tests --test live_sevenzip -- --ignored
//! ```

#![cfg(feature = "live-tests")]

mod common;

use auto_unpack::{Config, Event, EventBus, ToolsConfig, Watcher};
use common::{Workspace, collect_until, finished_count, outcome_for};
use serial_test::serial;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn extracts_a_real_zip_and_deletes_it() {
    let ws = Workspace::new();
    let archive = ws.downloads.join("bundle.zip");
    write_zip(
        &archive,
        &[("readme.txt", "hello from zip"), ("data/values.csv", "a,b\n1,2\n")],
    );

    let config = Config {
        delete_after_extract: true,
        tools: ToolsConfig {
            sevenzip_path: None,
            search_path: true,
        },
        ..ws.config()
    };
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let watcher = Watcher::new(config, Arc::new(bus));
    watcher.start().await.unwrap();

    let events = collect_until(&mut rx, Duration::from_secs(30), |events| {
        finished_count(events) >= 1
    })
    .await;
    watcher.shutdown().await;

    let outcome = outcome_for(&events, &archive);
    assert!(outcome.success, "outcome: {outcome:?}");
    assert!(outcome.source_removed);
    assert_eq!(
        std::fs::read_to_string(outcome.destination.join("readme.txt")).unwrap(),
        "hello from zip"
    );
    assert!(outcome.destination.join("data/values.csv").exists());
    assert!(!archive.exists());
}

#[tokio::test]
#[ignore]
#[serial]
async fn corrupt_archive_fails_and_is_kept() {
    let ws = Workspace::new();
    let archive = ws.drop_archive("corrupt.7z");

    let config = Config {
        delete_after_extract: true,
        ..ws.config()
    };
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let watcher = Watcher::new(config, Arc::new(bus));
    watcher.start().await.unwrap();

    let events = collect_until(&mut rx, Duration::from_secs(30), |events| {
        finished_count(events) >= 1
    })
    .await;
    watcher.shutdown().await;

    let outcome = outcome_for(&events, &archive);
    assert!(!outcome.success);
    assert!(archive.exists());
    assert!(
        events
            .iter()
            .any(|e| matches!(e, Event::ExtractionStarted { source, .. } if *source == archive))
    );
}
