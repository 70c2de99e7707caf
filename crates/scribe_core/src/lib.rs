//! Scribe Core
//!
//! The data model and pure algorithms behind keystroke playback:
//!
//! - **Events**: timestamped insert/delete/style/snapshot records
//! - **Event Log**: a bounded, append-only FIFO of events
//! - **Reconstruction**: replaying a log up to a cutoff to recover text and style
//! - **Clocks**: injectable time sources so recording and playback stay testable
//!
//! # Example
//!
//! ```rust
//! use scribe_core::{reconstruct_at, Event, EventLog, Timestamp};
//!
//! let mut log = EventLog::new();
//! log.append(Event::insert(Timestamp::from_millis(0), 0, "H"));
//! log.append(Event::insert(Timestamp::from_millis(100), 1, "i"));
//! log.append(Event::delete(Timestamp::from_millis(200), 0, 1));
//!
//! let frame = reconstruct_at(&log.dump(), 0.5);
//! assert_eq!(frame.text, "Hi");
//!
//! let frame = reconstruct_at(&log.dump(), 1.0);
//! assert_eq!(frame.text, "i");
//! ```

pub mod clock;
pub mod error;
pub mod event;
pub mod log;
pub mod reconstruct;
pub mod stats;
pub mod style;
pub mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, ScribeError};
pub use event::{decode_events, encode_events, Event};
pub use log::{EventLog, LogConfig, LogStats, DEFAULT_MAX_EVENTS};
pub use reconstruct::{
    reconstruct_at, reconstruct_from_snapshot, reconstruct_until, total_span, Frame, TextBuffer,
};
pub use stats::TextStats;
pub use style::{Color, Style, StylePatch};
pub use timestamp::Timestamp;
