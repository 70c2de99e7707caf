//! Time-accurate reconstruction of text and style from an event log.
//!
//! Reconstruction is a pure function of the event slice and a cutoff: the
//! same inputs always produce the same [`Frame`]. Callers take an immutable
//! copy of the log (see [`EventLog::dump`](crate::EventLog::dump)) per call,
//! so concurrent appends never affect a scan in progress.

use crate::{Event, Style, Timestamp};
use serde::{Deserialize, Serialize};

/// The reconstructed document state at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub text: String,
    pub style: Style,
}

impl Frame {
    /// Empty text in the default style.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// An editable character buffer that clamps every position it is given.
///
/// Indices are in `char` units so they agree with the positions recorded by
/// the editor regardless of UTF-8 width.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBuffer {
    chars: Vec<char>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn clamp(&self, index: i64) -> usize {
        index.clamp(0, self.chars.len() as i64) as usize
    }

    /// Insert `text` at `position`, clamped into `[0, len]`.
    pub fn insert(&mut self, position: i64, text: &str) {
        let at = self.clamp(position);
        self.chars.splice(at..at, text.chars());
    }

    /// Remove `[from, to)` after clamping both ends into `[0, len]`.
    ///
    /// A range that is empty or inverted after clamping removes nothing.
    pub fn delete(&mut self, from: i64, to: i64) {
        let start = self.clamp(from);
        let end = self.clamp(to);
        if start < end {
            self.chars.drain(start..end);
        }
    }

    /// Replace the whole contents.
    pub fn replace_all(&mut self, text: &str) {
        self.chars.clear();
        self.chars.extend(text.chars());
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Recorded span of a log in milliseconds, never less than 1.
pub fn total_span(events: &[Event]) -> u64 {
    match (events.first(), events.last()) {
        (Some(first), Some(last)) => last.time().saturating_sub(first.time()).max(1),
        _ => 1,
    }
}

/// Apply a single event to the running state.
fn apply(buffer: &mut TextBuffer, style: &mut Style, event: &Event) {
    match event {
        Event::Insert { position, text, .. } => buffer.insert(*position, text),
        Event::Delete { from, to, .. } => buffer.delete(*from, *to),
        Event::StyleChange { patch, .. } => style.apply(patch),
        Event::Snapshot { full_text, .. } => buffer.replace_all(full_text),
    }
}

/// Number of leading events that fall at or before `cutoff`.
///
/// Scanning stops at the first event past the cutoff, even if a later one
/// carries an earlier stamp.
fn prefix_len(events: &[Event], cutoff: Timestamp) -> usize {
    events
        .iter()
        .position(|e| e.time() > cutoff)
        .unwrap_or(events.len())
}

/// Reconstruct the state after every event stamped at or before `cutoff`.
pub fn reconstruct_until(events: &[Event], cutoff: Timestamp) -> Frame {
    let mut buffer = TextBuffer::new();
    let mut style = Style::default();

    for event in &events[..prefix_len(events, cutoff)] {
        apply(&mut buffer, &mut style, event);
    }

    Frame {
        text: buffer.as_string(),
        style,
    }
}

/// Resolve a fractional cutoff into an absolute time.
///
/// Returns `None` when nothing should be replayed: an empty log, or a
/// fraction at (or below) zero, which is the start of playback before the
/// first keystroke lands.
fn cutoff_time(events: &[Event], fraction: f64) -> Option<Timestamp> {
    let first = events.first()?.time();
    if fraction.is_nan() || fraction <= 0.0 {
        return None;
    }
    let elapsed = fraction.min(1.0) * total_span(events) as f64;
    Some(first.saturating_add(elapsed.floor() as u64))
}

/// Reconstruct the state at `fraction` (clamped to `[0, 1]`) of the recorded span.
pub fn reconstruct_at(events: &[Event], fraction: f64) -> Frame {
    match cutoff_time(events, fraction) {
        Some(cutoff) => reconstruct_until(events, cutoff),
        None => Frame::empty(),
    }
}

/// Same result as [`reconstruct_at`], but text replay starts from the last
/// snapshot at or before the cutoff.
///
/// Events before that snapshot only contribute their style changes.
pub fn reconstruct_from_snapshot(events: &[Event], fraction: f64) -> Frame {
    let Some(cutoff) = cutoff_time(events, fraction) else {
        return Frame::empty();
    };

    let visible = &events[..prefix_len(events, cutoff)];
    let start = visible.iter().rposition(Event::is_snapshot).unwrap_or(0);

    let mut style = Style::default();
    for event in &visible[..start] {
        if let Event::StyleChange { patch, .. } = event {
            style.apply(patch);
        }
    }

    let mut buffer = TextBuffer::new();
    for event in &visible[start..] {
        apply(&mut buffer, &mut style, event);
    }

    Frame {
        text: buffer.as_string(),
        style,
    }
}
