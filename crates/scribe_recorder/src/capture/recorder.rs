//! Translating editor notifications into stamped log events.

use super::LogHandle;
use crate::metrics::TypedCounter;
use scribe_core::{Clock, Event, Result, StylePatch, Timestamp};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A raw text change reported by the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOp {
    /// `text` inserted at `position`.
    Insert { position: i64, text: String },
    /// `[from, to)` removed.
    Delete { from: i64, to: i64 },
    /// `[from, to)` replaced by `text`, e.g. typing over a selection.
    Replace { from: i64, to: i64, text: String },
}

impl EditOp {
    pub fn insert(position: i64, text: impl Into<String>) -> Self {
        EditOp::Insert {
            position,
            text: text.into(),
        }
    }

    pub fn delete(from: i64, to: i64) -> Self {
        EditOp::Delete { from, to }
    }

    pub fn replace(from: i64, to: i64, text: impl Into<String>) -> Self {
        EditOp::Replace {
            from,
            to,
            text: text.into(),
        }
    }

    /// Characters this edit contributes to the typing-speed counter.
    ///
    /// Only single-character insertions are keystrokes; pastes and deletions
    /// do not count.
    fn typed_chars(&self) -> u64 {
        match self {
            EditOp::Insert { text, .. } | EditOp::Replace { text, .. }
                if text.chars().count() == 1 =>
            {
                1
            }
            _ => 0,
        }
    }

    fn into_events(self) -> SmallVec<[Event; 2]> {
        let t = Timestamp::zero();
        match self {
            EditOp::Insert { position, text } => smallvec![Event::insert(t, position, text)],
            EditOp::Delete { from, to } => smallvec![Event::delete(t, from, to)],
            EditOp::Replace { from, to, text } => smallvec![
                Event::delete(t, from, to),
                Event::insert(t, from, text),
            ],
        }
    }
}

/// Stamps editor notifications and appends them to the event log.
///
/// The recorder keeps no text of its own. Its only state is the last stamp
/// handed out: every event gets a stamp strictly greater than the previous
/// one, even when the clock stalls or steps backwards.
pub struct Recorder {
    log: LogHandle,
    clock: Arc<dyn Clock>,
    typed: Option<TypedCounter>,
    // Held across the send so stamp order and queue order always agree.
    last_stamp: Mutex<Option<Timestamp>>,
}

impl Recorder {
    pub fn new(log: LogHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            clock,
            typed: None,
            last_stamp: Mutex::new(None),
        }
    }

    /// Count typed characters into `counter` as edits are recorded.
    pub fn with_typed_counter(mut self, counter: TypedCounter) -> Self {
        self.typed = Some(counter);
        self
    }

    /// The log this recorder appends to.
    pub fn log(&self) -> &LogHandle {
        &self.log
    }

    /// Record a text change.
    pub async fn record_edit(&self, op: EditOp) -> Result<()> {
        let typed = op.typed_chars();
        self.append_stamped(op.into_events()).await?;
        if let Some(counter) = &self.typed {
            counter.add(typed);
        }
        Ok(())
    }

    /// Record a partial style change.
    pub async fn record_style(&self, patch: StylePatch) -> Result<()> {
        self.append_stamped(smallvec![Event::style(Timestamp::zero(), patch)])
            .await
    }

    /// Record a full-text checkpoint.
    pub async fn record_snapshot(&self, full_text: impl Into<String>) -> Result<()> {
        self.append_stamped(smallvec![Event::snapshot(Timestamp::zero(), full_text)])
            .await
    }

    async fn append_stamped(&self, events: SmallVec<[Event; 2]>) -> Result<()> {
        let mut last = self.last_stamp.lock().await;
        for event in events {
            let stamp = next_stamp(*last, self.clock.now());
            self.log.append(event.with_time(stamp)).await?;
            *last = Some(stamp);
        }
        Ok(())
    }
}

/// The clock reading, bumped past `previous` if it does not move forward.
fn next_stamp(previous: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match previous {
        Some(prev) if now <= prev => prev.saturating_add(1),
        _ => now,
    }
}
