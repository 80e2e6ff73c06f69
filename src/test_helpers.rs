//! Shared fixtures for unit tests: a scriptable archiver and an in-memory event sink

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::error::ExtractionError;
use crate::events::EventSink;
use crate::tool::{ExtractionTool, ToolOutput};
use crate::types::{Event, ExtractionOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What [`FakeTool::run`] does
#[derive(Clone, Debug)]
pub(crate) enum FakeBehavior {
    /// Write `<stem>.txt` into the destination and exit 0
    Succeed,
    /// Exit with the given code and stderr, touching nothing
    Fail { exit_code: i32, stderr: String },
    /// Behave as if the binary could not be launched
    Unavailable,
    /// Succeed, but remove the source archive first so a later deletion fails
    SucceedAndRemoveSource,
    /// Panic inside the worker task
    Panic,
}

pub(crate) struct FakeTool {
    behavior: FakeBehavior,
    delay: Duration,
    calls: Mutex<Vec<PathBuf>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl FakeTool {
    pub(crate) fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionTool for FakeTool {
    async fn run(
        &self,
        archive: &Path,
        destination: &Path,
    ) -> Result<ToolOutput, ExtractionError> {
        self.calls.lock().unwrap().push(archive.to_path_buf());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            FakeBehavior::Succeed | FakeBehavior::SucceedAndRemoveSource => {
                if matches!(self.behavior, FakeBehavior::SucceedAndRemoveSource) {
                    std::fs::remove_file(archive).unwrap();
                }
                let stem = archive.file_stem().unwrap().to_string_lossy().into_owned();
                std::fs::write(destination.join(format!("{stem}.txt")), b"extracted").unwrap();
                Ok(ToolOutput {
                    exit_code: Some(0),
                    stdout: "Everything is Ok".into(),
                    stderr: String::new(),
                })
            }
            FakeBehavior::Fail { exit_code, stderr } => Ok(ToolOutput {
                exit_code: Some(*exit_code),
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
            FakeBehavior::Unavailable => Err(ExtractionError::ToolUnavailable {
                tool: PathBuf::from("fake-7z"),
                reason: "not installed".into(),
            }),
            FakeBehavior::Panic => panic!("fake archiver crashed"),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Event sink that keeps every event in memory
#[derive(Default)]
pub(crate) struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub(crate) fn outcomes(&self) -> Vec<ExtractionOutcome> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::ExtractionFinished { outcome } => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    /// Poll until `pred` holds for at least `n` events, panicking after `timeout`
    pub(crate) async fn wait_for(
        &self,
        n: usize,
        timeout: Duration,
        pred: impl Fn(&Event) -> bool,
    ) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(&pred) >= n {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "timed out waiting for {n} matching events, got: {:#?}",
                    self.events()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub(crate) fn is_finished(event: &Event) -> bool {
    matches!(event, Event::ExtractionFinished { .. })
}

pub(crate) fn is_discovered(event: &Event) -> bool {
    matches!(event, Event::Discovered { .. })
}
