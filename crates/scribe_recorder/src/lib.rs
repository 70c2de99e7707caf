//! Scribe Recorder
//!
//! Keystroke capture and playback built on [`scribe_core`].
//!
//! This crate provides:
//! - `capture` - A log worker task fed through a bounded queue, and the
//!   `Recorder` that stamps editor notifications into it
//! - `metrics` - A smoothed words-per-minute estimate and the repeating task
//!   that samples it
//! - `replay` - The playback scheduler (play/pause/seek/rate) and its
//!   per-frame driver
//! - `render` - The seam to the drawing surface: text layout and frame capture
//! - `export` - Driving playback at a fixed rate into a transcoder
//!
//! # Example
//!
//! ```ignore
//! use scribe_recorder::capture::{EditOp, LogWorker, Recorder};
//! use scribe_recorder::replay::{PlaybackConfig, PlaybackScheduler};
//!
//! let (log, _worker) = LogWorker::spawn(&LogConfig::default());
//! let recorder = Recorder::new(log.clone(), Arc::new(SystemClock));
//! recorder.record_edit(EditOp::insert(0, "H")).await?;
//!
//! let mut player = PlaybackScheduler::new(PlaybackConfig::default(), Arc::new(SystemClock));
//! player.load(log.dump().await?);
//! player.set_rate(2.0);
//! player.play();
//! ```

pub mod capture;
pub mod export;
pub mod metrics;
pub mod render;
pub mod replay;

pub use capture::{EditOp, LogCommand, LogHandle, LogWorker, Recorder};
pub use export::{ExportArtifact, ExportConfig, ExportError, ExportFormat, ExportSession, Notice, Transcoder};
pub use metrics::{MetricSampler, MetricsConfig, MetricsUpdate, RollingWpm, SamplerHandle, TypedCounter};
pub use render::{CaptureSink, FrameSequence, FrameSink, LayoutSink, RenderConfig, RenderedFrame, TextLayout};
pub use replay::{PlaybackConfig, PlaybackDriver, PlaybackScheduler, PlaybackSignal, PlaybackState};
