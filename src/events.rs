//! Event delivery
//!
//! The watcher and workers only know the [`EventSink`] trait. [`EventBus`] is the
//! provided implementation: it stamps every event with the current time and fans it
//! out over a broadcast channel, so a console logger, a UI and a test harness can each
//! drain the stream independently.

use crate::types::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default capacity of the broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Consumer of pipeline events
///
/// Implementations must accept events from several workers at once and must not block:
/// delivery is fire-and-forget.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: Event);
}

/// An [`Event`] with the time it was emitted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// The event itself
    pub event: Event,
}

impl EventRecord {
    /// Stamp `event` with the current time
    pub fn now(event: Event) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Human readable message without the timestamp
    pub fn message(&self) -> String {
        self.event.message()
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event.message()
        )
    }
}

/// Broadcast-backed [`EventSink`]
///
/// Cloning an `EventBus` yields another handle to the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
}

impl EventBus {
    /// Create a bus with [`DEFAULT_EVENT_CAPACITY`]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bus that buffers up to `capacity` events per lagging subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all events emitted from now on
    ///
    /// Slow subscribers that fall more than the channel capacity behind receive
    /// `RecvError::Lagged` and skip ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: Event) {
        if event.is_failure() {
            tracing::warn!(detail = %event.message(), "pipeline event");
        } else {
            tracing::debug!(detail = %event.message(), "pipeline event");
        }
        // send() only fails when nobody is subscribed; the event is dropped in that case
        self.tx.send(EventRecord::now(event)).ok();
    }
}
