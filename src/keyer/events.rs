//! Debug event stream
//!
//! An append-only, ordered record of what the keyer did (key-up, key-down,
//! mode changes, completions, errors). The front end reads it with a cursor;
//! every push is mirrored to the `log` facade as well.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use jiff::tz::TimeZone;
use jiff::Timestamp;

/// Oldest events are dropped past this many
const MAX_EVENTS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    KeyUp,
    KeyDown,
    ModeChange,
    Completion,
    Error,
    State,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugEvent {
    pub at: Timestamp,
    pub kind: EventKind,
    pub message: String,
}

impl DebugEvent {
    /// Local wall-clock time, "HH:MM:SS"
    pub fn clock(&self) -> String {
        self.at
            .to_zoned(TimeZone::system())
            .strftime("%H:%M:%S")
            .to_string()
    }
}

impl fmt::Display for DebugEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.clock(), self.message)
    }
}

#[derive(Debug, Default)]
struct Store {
    events: VecDeque<DebugEvent>,
    /// Absolute index of `events[0]`
    first: usize,
}

/// Shared handle to the event stream. Clones append to the same stream.
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    store: Arc<Mutex<Store>>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            EventKind::Error => log::error!("{message}"),
            _ => log::info!("{message}"),
        }
        let mut store = self.lock();
        store.events.push_back(DebugEvent {
            at: Timestamp::now(),
            kind,
            message,
        });
        if store.events.len() > MAX_EVENTS {
            store.events.pop_front();
            store.first += 1;
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(EventKind::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(EventKind::Error, message);
    }

    /// Total number of events ever pushed; use as the next cursor.
    pub fn len(&self) -> usize {
        let store = self.lock();
        store.first + store.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events pushed at or after absolute position `cursor`
    pub fn since(&self, cursor: usize) -> Vec<DebugEvent> {
        let store = self.lock();
        let skip = cursor.saturating_sub(store.first);
        store.events.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<DebugEvent> {
        self.since(0)
    }

    /// Event kinds in order, for checking sequences
    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().events.iter().map(|e| e.kind).collect()
    }

    pub fn clear(&self) {
        let mut store = self.lock();
        store.first += store.events.len();
        store.events.clear();
    }
}
