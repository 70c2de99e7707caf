//! Millisecond timestamps for recorded events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, in milliseconds.
///
/// Recorded events carry wall-clock milliseconds; playback only ever looks at
/// differences between them, so the epoch is irrelevant to reconstruction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero timestamp.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the timestamp in milliseconds.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the timestamp in fractional seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Milliseconds elapsed since `earlier`, or zero if `earlier` is later.
    pub const fn saturating_sub(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Add milliseconds, saturating at `u64::MAX`.
    pub const fn saturating_add(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
