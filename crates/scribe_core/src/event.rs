//! Recorded edit, style and snapshot events.

use crate::{Result, StylePatch, Timestamp};
use serde::{Deserialize, Serialize};

/// A single timestamped entry of the event log.
///
/// Positions are character indices (Unicode scalar values) into the text as it
/// stands when the event is replayed. They are stored exactly as reported by
/// the editor; out-of-range values are clamped during reconstruction, never
/// at record time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// `text` inserted at `position`.
    Insert {
        time: Timestamp,
        position: i64,
        text: String,
    },
    /// The half-open range `[from, to)` removed.
    Delete { time: Timestamp, from: i64, to: i64 },
    /// Partial update of presentation attributes.
    StyleChange {
        time: Timestamp,
        #[serde(flatten)]
        patch: StylePatch,
    },
    /// Authoritative copy of the whole text.
    Snapshot { time: Timestamp, full_text: String },
}

impl Event {
    pub fn insert(time: Timestamp, position: i64, text: impl Into<String>) -> Self {
        Event::Insert {
            time,
            position,
            text: text.into(),
        }
    }

    pub fn delete(time: Timestamp, from: i64, to: i64) -> Self {
        Event::Delete { time, from, to }
    }

    pub fn style(time: Timestamp, patch: StylePatch) -> Self {
        Event::StyleChange { time, patch }
    }

    pub fn snapshot(time: Timestamp, full_text: impl Into<String>) -> Self {
        Event::Snapshot {
            time,
            full_text: full_text.into(),
        }
    }

    /// When the event happened.
    pub fn time(&self) -> Timestamp {
        match self {
            Event::Insert { time, .. }
            | Event::Delete { time, .. }
            | Event::StyleChange { time, .. }
            | Event::Snapshot { time, .. } => *time,
        }
    }

    /// The same event restamped at `stamp`.
    pub fn with_time(mut self, stamp: Timestamp) -> Self {
        match &mut self {
            Event::Insert { time, .. }
            | Event::Delete { time, .. }
            | Event::StyleChange { time, .. }
            | Event::Snapshot { time, .. } => *time = stamp,
        }
        self
    }

    /// Whether this event is a full-text checkpoint.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Event::Snapshot { .. })
    }

    /// Short name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Insert { .. } => "insert",
            Event::Delete { .. } => "delete",
            Event::StyleChange { .. } => "style",
            Event::Snapshot { .. } => "snapshot",
        }
    }
}

/// Serialize an ordered event sequence as a JSON dump.
pub fn encode_events(events: &[Event]) -> Result<String> {
    Ok(serde_json::to_string_pretty(events)?)
}

/// Decode a JSON dump produced by [`encode_events`].
pub fn decode_events(json: &str) -> Result<Vec<Event>> {
    Ok(serde_json::from_str(json)?)
}
