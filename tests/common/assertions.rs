//! Helpers for waiting on the event stream

use auto_unpack::{Event, EventRecord, ExtractionOutcome};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Collect events until `done` returns true for the collected list, or `timeout` passes
///
/// Returns everything received either way.
pub async fn collect_until(
    rx: &mut broadcast::Receiver<EventRecord>,
    timeout: Duration,
    done: impl Fn(&[Event]) -> bool,
) -> Vec<Event> {
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while !done(&events) {
            match rx.recv().await {
                Ok(record) => events.push(record.event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;
    events
}

/// Collect events for the whole `window`
pub async fn collect_for(
    rx: &mut broadcast::Receiver<EventRecord>,
    window: Duration,
) -> Vec<Event> {
    collect_until(rx, window, |_| false).await
}

/// Number of `ExtractionFinished` events
pub fn finished_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::ExtractionFinished { .. }))
        .count()
}

/// Number of `Discovered` events for `path`
pub fn discovered_count(events: &[Event], path: &Path) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Discovered { path: p } if p == path))
        .count()
}

/// The single outcome reported for `source`; panics if there is not exactly one
pub fn outcome_for(events: &[Event], source: &Path) -> ExtractionOutcome {
    let outcomes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::ExtractionFinished { outcome } if outcome.source == source => {
                Some(outcome.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        outcomes.len(),
        1,
        "expected exactly one outcome for {}, events: {events:#?}",
        source.display()
    );
    outcomes.into_iter().next().unwrap()
}
