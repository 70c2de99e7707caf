//! Bounded, append-only event log.
//!
//! The log is a faithful record of raw editor input: nothing is validated or
//! rewritten on the way in. Once it holds `capacity` events, each append
//! evicts the oldest entry.

use crate::{Event, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum number of retained events.
pub const DEFAULT_MAX_EVENTS: usize = 50_000;

/// Configuration for the event log and its ingestion queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum number of retained events.
    pub max_events: usize,
    /// Depth of the bounded command queue in front of the log worker.
    pub queue_depth: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            queue_depth: 256,
        }
    }
}

/// Diagnostic counters for an event log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// Number of retained events.
    pub len: usize,
    /// Maximum number of retained events.
    pub capacity: usize,
    /// Events dropped by FIFO eviction since the last clear.
    pub evicted: u64,
    /// Time of the oldest retained event.
    pub first: Option<Timestamp>,
    /// Time of the newest retained event.
    pub last: Option<Timestamp>,
}

/// An append-only FIFO of events with a fixed capacity.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    evicted: u64,
}

impl EventLog {
    /// Create an empty log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }

    /// Create an empty log holding at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            evicted: 0,
        }
    }

    /// Create a log from a config.
    pub fn from_config(config: &LogConfig) -> Self {
        Self::with_capacity(config.max_events)
    }

    /// Append an event, evicting the oldest one if the log is full.
    pub fn append(&mut self, event: Event) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.evicted += 1;
            tracing::trace!(evicted = self.evicted, "event log full, evicted oldest event");
        }
        self.events.push_back(event);
    }

    /// Copy out the retained events in append order. The log is not modified.
    pub fn dump(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    /// Iterate over the retained events in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Remove all events and reset the eviction counter.
    pub fn clear(&mut self) {
        self.events.clear();
        self.evicted = 0;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events dropped by eviction since the last clear.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn stats(&self) -> LogStats {
        LogStats {
            len: self.events.len(),
            capacity: self.capacity,
            evicted: self.evicted,
            first: self.events.front().map(Event::time),
            last: self.events.back().map(Event::time),
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Event> for EventLog {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        for event in iter {
            self.append(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_at(t: u64) -> Event {
        Event::insert(Timestamp::from_millis(t), 0, "x")
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = EventLog::new();
        log.append(insert_at(5));
        log.append(insert_at(5));
        log.append(insert_at(9));

        let times: Vec<u64> = log.iter().map(|e| e.time().as_millis()).collect();
        assert_eq!(times, vec![5, 5, 9]);
    }

    #[test]
    fn test_dump_does_not_mutate() {
        let mut log = EventLog::new();
        log.append(insert_at(1));
        let first = log.dump();
        let second = log.dump();
        assert_eq!(first, second);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let capacity = 100;
        let extra = 7;
        let mut log = EventLog::with_capacity(capacity);
        for t in 0..(capacity + extra) as u64 {
            log.append(insert_at(t));
        }

        assert_eq!(log.len(), capacity);
        assert_eq!(log.evicted(), extra as u64);
        let times: Vec<u64> = log.iter().map(|e| e.time().as_millis()).collect();
        let expected: Vec<u64> = (extra as u64..(capacity + extra) as u64).collect();
        assert_eq!(times, expected);
    }

    #[test]
    fn test_default_capacity_eviction_bound() {
        let mut log = EventLog::new();
        log.extend((0..(DEFAULT_MAX_EVENTS as u64 + 3)).map(insert_at));

        assert_eq!(log.len(), DEFAULT_MAX_EVENTS);
        let stats = log.stats();
        assert_eq!(stats.evicted, 3);
        assert_eq!(stats.first, Some(Timestamp::from_millis(3)));
        assert_eq!(stats.last, Some(Timestamp::from_millis(DEFAULT_MAX_EVENTS as u64 + 2)));
    }

    #[test]
    fn test_clear() {
        let mut log = EventLog::with_capacity(1);
        log.append(insert_at(1));
        log.append(insert_at(2));
        assert_eq!(log.evicted(), 1);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.evicted(), 0);
        assert_eq!(log.stats().first, None);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut log = EventLog::with_capacity(0);
        log.append(insert_at(1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.capacity(), 1);
    }
}
