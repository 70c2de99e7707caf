//! Exporting a playback as a video or animated image.
//!
//! An [`ExportSession`] runs its own [`PlaybackScheduler`] on a
//! [`ManualClock`], stepping it at the export frame rate, so capture is
//! deterministic and never touches the interactive player. The captured
//! [`FrameSequence`] is handed to a [`Transcoder`], which owns encoding.

use crate::render::{CaptureSink, FrameSequence, RenderConfig};
use crate::replay::{sanitize_rate, PlaybackConfig, PlaybackScheduler};
use parking_lot::Mutex;
use scribe_core::{Event, ManualClock, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Recording length assumed when a log has no measurable span.
const FALLBACK_SPAN_MS: u64 = 3_000;

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Nothing was captured
    #[error("no frames were captured")]
    NoFrames,

    /// The transcoder rejected the frames
    #[error("transcoding failed: {0}")]
    Transcoder(String),

    /// Reading or writing the artifact failed
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The export was cancelled before it completed
    #[error("export cancelled")]
    Cancelled,
}

/// Target container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Mp4,
    Mov,
    Gif,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Mp4, ExportFormat::Mov, ExportFormat::Gif];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Mov => "mov",
            ExportFormat::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Mov => "video/quicktime",
            ExportFormat::Gif => "image/gif",
        }
    }

    /// `ffmpeg` arguments that convert `input` into this format at `output`.
    pub fn transcoder_args(self, input: &str, output: &str) -> Vec<String> {
        let codec: &[&str] = match self {
            ExportFormat::Gif => &["-vf", "fps=12,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse"],
            ExportFormat::Mp4 => &["-movflags", "faststart", "-pix_fmt", "yuv420p", "-vcodec", "libx264"],
            ExportFormat::Mov => &["-vcodec", "libx264", "-pix_fmt", "yuv420p", "-f", "mov"],
        };
        let mut args = vec!["-i".to_string(), input.to_string()];
        args.extend(codec.iter().map(|arg| arg.to_string()));
        args.push(output.to_string());
        args
    }

    /// Download name of the exported file.
    pub fn file_name(self) -> String {
        format!("playback.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(ExportFormat::Mp4),
            "mov" | "quicktime" => Ok(ExportFormat::Mov),
            "gif" => Ok(ExportFormat::Gif),
            other => Err(format!("unknown export format '{other}' (expected mp4, mov or gif)")),
        }
    }
}

/// Export timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Capture frame rate.
    pub fps: u32,
    /// How long the final frame is held after playback ends.
    pub tail_ms: u64,
    /// Upper bound on captured frames.
    pub max_frames: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            tail_ms: 500,
            max_frames: 36_000,
        }
    }
}

/// An encoded export, ready to save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns captured frames into an encoded file.
pub trait Transcoder: Send {
    fn transcode(
        &mut self,
        frames: &FrameSequence,
        fps: u32,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ExportError>;
}

/// Dismissible user-facing messages about an export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    ExportStarted(ExportFormat),
    ExportSaved { format: ExportFormat, file_name: String },
    ExportFailed { format: ExportFormat, reason: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::ExportStarted(_) => "Preparing export…".to_string(),
            Notice::ExportSaved { format, .. } => {
                format!("Saved {}", format.extension().to_ascii_uppercase())
            }
            Notice::ExportFailed { reason, .. } => format!("Export failed: {reason}"),
        }
    }
}

/// One export run over a fixed log.
pub struct ExportSession {
    config: ExportConfig,
    render: RenderConfig,
    rate: f64,
    notices: Option<mpsc::UnboundedSender<Notice>>,
    cancel: Arc<AtomicBool>,
}

impl ExportSession {
    pub fn new(config: ExportConfig, render: RenderConfig) -> Self {
        Self {
            config,
            render,
            rate: 1.0,
            notices: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Play back at `rate` while capturing.
    ///
    /// The rate is clamped to the range the scheduler accepts, so the capture
    /// length always matches the playback it records.
    pub fn with_rate(mut self, rate: f64) -> Self {
        if let Some(rate) = sanitize_rate(rate) {
            self.rate = rate;
        }
        self
    }

    /// Send progress notices to `tx`.
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<Notice>) -> Self {
        self.notices = Some(tx);
        self
    }

    /// Flag that aborts the capture when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Number of frames a log of `span_ms` is captured into.
    pub fn frame_count(&self, span_ms: u64) -> u64 {
        let span_ms = if span_ms == 0 { FALLBACK_SPAN_MS } else { span_ms };
        let played = (span_ms as f64 / self.rate).ceil() as u64;
        ((played + self.config.tail_ms) * self.config.fps.max(1) as u64).div_ceil(1000)
    }

    /// Capture `events` and encode them with `transcoder`.
    ///
    /// Failures are reported on the notice channel as well as returned.
    pub fn run(
        &self,
        events: &[Event],
        format: ExportFormat,
        transcoder: &mut dyn Transcoder,
    ) -> Result<ExportArtifact, ExportError> {
        self.notify(Notice::ExportStarted(format));
        tracing::info!(%format, events = events.len(), rate = self.rate, "export started");

        let result = self
            .capture(events)
            .and_then(|frames| transcoder.transcode(&frames, self.config.fps, format));

        match result {
            Ok(bytes) => {
                let artifact = ExportArtifact {
                    file_name: format.file_name(),
                    mime_type: format.mime_type(),
                    bytes,
                };
                tracing::info!(file = %artifact.file_name, bytes = artifact.bytes.len(), "export saved");
                self.notify(Notice::ExportSaved {
                    format,
                    file_name: artifact.file_name.clone(),
                });
                Ok(artifact)
            }
            Err(err) => {
                tracing::warn!(%format, error = %err, "export failed");
                self.notify(Notice::ExportFailed {
                    format,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Play the log through a capture sink, one frame at a time.
    pub fn capture(&self, events: &[Event]) -> Result<FrameSequence, ExportError> {
        let fps = self.config.fps.max(1);
        let clock = Arc::new(ManualClock::new(Timestamp::zero()));
        let sink = Arc::new(Mutex::new(CaptureSink::new(
            self.render.clone(),
            self.config.max_frames,
        )));
        let playback = PlaybackConfig::default().with_rate(self.rate).with_fps(fps);
        let mut scheduler = PlaybackScheduler::new(playback, clock.clone()).with_sink(sink.clone());

        scheduler.load(events.to_vec());
        // Loading draws the opening frame; the first tick draws it again.
        sink.lock().take_sequence();

        let span_ms = match (events.first(), events.last()) {
            (Some(first), Some(last)) => last.time().saturating_sub(first.time()),
            _ => 0,
        };
        let frames = self.frame_count(span_ms);
        scheduler.play();

        for index in 0..frames {
            if self.cancel.load(Ordering::Relaxed) {
                scheduler.close();
                return Err(ExportError::Cancelled);
            }
            clock.set(Timestamp::from_millis(index * 1000 / fps as u64));
            if scheduler.tick().is_none() {
                sink.lock().repeat_last(1);
            }
            if sink.lock().sequence().is_full() {
                tracing::warn!(index, frames, "export frame limit reached");
                break;
            }
        }
        scheduler.close();

        let sequence = sink.lock().take_sequence();
        if sequence.is_empty() {
            return Err(ExportError::NoFrames);
        }
        tracing::debug!(frames = sequence.len(), "export capture complete");
        Ok(sequence)
    }

    fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notices {
            if tx.send(notice).is_err() {
                tracing::trace!("notice receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockTranscoder {
        calls: Vec<(usize, u32, ExportFormat)>,
        last_text: Option<String>,
        fail: bool,
    }

    impl Transcoder for MockTranscoder {
        fn transcode(
            &mut self,
            frames: &FrameSequence,
            fps: u32,
            format: ExportFormat,
        ) -> Result<Vec<u8>, ExportError> {
            self.calls.push((frames.len(), fps, format));
            self.last_text = frames.last().map(|f| f.rendered.to_plain_text());
            if self.fail {
                return Err(ExportError::Transcoder("encoder exited with status 1".into()));
            }
            Ok(vec![0u8; frames.len()])
        }
    }

    fn events() -> Vec<Event> {
        vec![
            Event::insert(Timestamp::from_millis(2_000), 0, "a"),
            Event::insert(Timestamp::from_millis(3_000), 1, "b"),
        ]
    }

    #[test]
    fn test_format_details() {
        assert_eq!(ExportFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(ExportFormat::Mov.mime_type(), "video/quicktime");
        assert_eq!(ExportFormat::Gif.mime_type(), "image/gif");
        assert_eq!(ExportFormat::Gif.file_name(), "playback.gif");
        assert_eq!("MP4".parse::<ExportFormat>(), Ok(ExportFormat::Mp4));
        assert!("webm".parse::<ExportFormat>().is_err());

        let args = ExportFormat::Mov.transcoder_args("in.webm", "out.mov");
        assert_eq!(
            args,
            vec!["-i", "in.webm", "-vcodec", "libx264", "-pix_fmt", "yuv420p", "-f", "mov", "out.mov"]
        );
        let gif = ExportFormat::Gif.transcoder_args("a", "b");
        assert!(gif[3].starts_with("fps=12,"));
    }

    #[test]
    fn test_frame_count_covers_span_and_tail() {
        let session = ExportSession::new(ExportConfig::default(), RenderConfig::default());
        assert_eq!(session.frame_count(1_000), 45);
        assert_eq!(session.frame_count(0), 105);

        let fast = ExportSession::new(ExportConfig::default(), RenderConfig::default()).with_rate(2.0);
        assert_eq!(fast.frame_count(1_000), 30);
    }

    #[test]
    fn test_rate_above_limit_still_reaches_the_end() {
        let events = vec![
            Event::insert(Timestamp::from_millis(0), 0, "a"),
            Event::insert(Timestamp::from_millis(60_000), 1, "b"),
        ];
        let session =
            ExportSession::new(ExportConfig::default(), RenderConfig::default()).with_rate(100.0);
        // Captured at the 16x ceiling: 3750ms of playback plus the tail.
        assert_eq!(session.frame_count(60_000), 128);

        let frames = session.capture(&events).unwrap();
        assert_eq!(frames.len(), 128);
        assert_eq!(frames.last().unwrap().rendered.to_plain_text(), "ab");

        let slow = ExportSession::new(ExportConfig::default(), RenderConfig::default()).with_rate(0.01);
        assert_eq!(slow.frame_count(1_000), 315);
    }

    #[test]
    fn test_export_captures_and_notifies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session =
            ExportSession::new(ExportConfig::default(), RenderConfig::default()).with_notices(tx);
        let mut transcoder = MockTranscoder::default();

        let artifact = session.run(&events(), ExportFormat::Mp4, &mut transcoder).unwrap();
        assert_eq!(artifact.file_name, "playback.mp4");
        assert_eq!(artifact.mime_type, "video/mp4");
        assert_eq!(artifact.bytes.len(), 45);
        assert_eq!(transcoder.calls, vec![(45, 30, ExportFormat::Mp4)]);
        assert_eq!(transcoder.last_text.as_deref(), Some("ab"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.message(), "Preparing export…");
        let saved = rx.try_recv().unwrap();
        assert_eq!(saved.message(), "Saved MP4");
    }

    #[test]
    fn test_capture_starts_blank_and_holds_final_frame() {
        let session = ExportSession::new(ExportConfig::default(), RenderConfig::default());
        let frames = session.capture(&events()).unwrap();
        assert_eq!(frames.get(0).unwrap().rendered.to_plain_text(), "");
        assert_eq!(frames.last().unwrap().rendered.to_plain_text(), "ab");
        // Two keystrokes: blank to "a", then "a" to "ab".
        assert_eq!(frames.distinct_transitions(), 2);
    }

    #[test]
    fn test_transcoder_failure_is_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session =
            ExportSession::new(ExportConfig::default(), RenderConfig::default()).with_notices(tx);
        let mut transcoder = MockTranscoder {
            fail: true,
            ..Default::default()
        };

        let err = session.run(&events(), ExportFormat::Gif, &mut transcoder).unwrap_err();
        assert!(matches!(err, ExportError::Transcoder(_)));

        rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            Notice::ExportFailed { format, reason } => {
                assert_eq!(format, ExportFormat::Gif);
                assert!(reason.contains("status 1"));
            }
            other => panic!("unexpected notice {other:?}"),
        }

        // The same session can be retried.
        transcoder.fail = false;
        assert!(session.run(&events(), ExportFormat::Gif, &mut transcoder).is_ok());
    }

    #[test]
    fn test_cancelled_export() {
        let session = ExportSession::new(ExportConfig::default(), RenderConfig::default());
        session.cancel_flag().store(true, Ordering::Relaxed);
        let mut transcoder = MockTranscoder::default();
        let err = session.run(&events(), ExportFormat::Mov, &mut transcoder).unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
        assert!(transcoder.calls.is_empty());
    }

    #[test]
    fn test_frame_limit_bounds_capture() {
        let config = ExportConfig {
            max_frames: 10,
            ..ExportConfig::default()
        };
        let session = ExportSession::new(config, RenderConfig::default());
        let frames = session.capture(&events()).unwrap();
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn test_empty_log_exports_blank_frames() {
        let session = ExportSession::new(ExportConfig::default(), RenderConfig::default());
        let frames = session.capture(&[]).unwrap();
        assert_eq!(frames.len(), 105);
        assert_eq!(frames.distinct_transitions(), 0);
    }
}
