//! Event capture.
//!
//! The event log lives in its own task and is only reached through a bounded
//! command queue, so a long reconstruction on the playback side never blocks
//! input capture. The queue has a single consumer, which serializes appends
//! from any number of producers.

mod recorder;
mod worker;

pub use recorder::{EditOp, Recorder};
pub use worker::{LogCommand, LogHandle, LogWorker};
