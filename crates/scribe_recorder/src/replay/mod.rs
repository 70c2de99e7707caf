//! Playback of recorded sessions.
//!
//! [`PlaybackScheduler`] owns the cursor, rate and state machine and is
//! driven by calling [`tick`](PlaybackScheduler::tick) once per frame.
//! [`PlaybackDriver`] does that from a tokio task for hosts without their
//! own frame callback.

mod driver;
mod scheduler;

pub use driver::PlaybackDriver;
pub(crate) use scheduler::sanitize_rate;
pub use scheduler::{
    format_clock, PlaybackConfig, PlaybackScheduler, PlaybackSignal, PlaybackState, MAX_RATE,
    MIN_RATE, PRESET_RATES,
};
