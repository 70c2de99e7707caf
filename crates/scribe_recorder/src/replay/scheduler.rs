//! Time cursor over a loaded event log.

use crate::render::FrameSink;
use scribe_core::{reconstruct_from_snapshot, total_span, Clock, Event, Frame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Rates offered by the playback speed menu.
pub const PRESET_RATES: [f64; 5] = [1.0, 1.25, 1.5, 2.0, 3.0];

/// Slowest accepted playback rate.
pub const MIN_RATE: f64 = 0.1;

/// Fastest accepted playback rate.
pub const MAX_RATE: f64 = 16.0;

const SIGNAL_CAPACITY: usize = 64;

/// Configuration for the playback scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Rate used until `set_rate` is called.
    pub initial_rate: f64,
    /// Tick frequency of the driver, and the step size for frame stepping.
    pub fps: u32,
    /// Start over instead of finishing when the cursor reaches the end.
    pub loop_playback: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_rate: 1.0,
            fps: 60,
            loop_playback: false,
        }
    }
}

impl PlaybackConfig {
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.initial_rate = rate;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_loop(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    /// Length of one frame in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps.max(1) as f64
    }
}

/// Where the scheduler is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded.
    Idle,
    /// Loaded, cursor at the start, not yet played.
    Ready,
    Running,
    Paused,
    /// Cursor at the end, not running.
    Finished,
}

/// Notifications published by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackSignal {
    Loaded { events: usize, span_ms: u64 },
    Started,
    Paused,
    Seeked(f64),
    RateChanged(f64),
    /// The cursor reached the end while running.
    Finished,
    Closed,
}

/// Drives a cursor across the recorded span and renders what it passes.
///
/// Elapsed recording time is `(now - anchor) * rate`. Every change that
/// would make that formula jump (resume, seek, rate change) moves the
/// anchor instead, so the cursor stays continuous.
pub struct PlaybackScheduler {
    config: PlaybackConfig,
    clock: Arc<dyn Clock>,
    events: Option<Arc<[Event]>>,
    span_ms: u64,
    cursor: f64,
    rate: f64,
    anchor_ms: f64,
    state: PlaybackState,
    sink: Option<Box<dyn FrameSink>>,
    frame: Frame,
    signals: broadcast::Sender<PlaybackSignal>,
}

impl PlaybackScheduler {
    pub fn new(config: PlaybackConfig, clock: Arc<dyn Clock>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        let rate = sanitize_rate(config.initial_rate).unwrap_or(1.0);
        Self {
            config,
            clock,
            events: None,
            span_ms: 1,
            cursor: 0.0,
            rate,
            anchor_ms: 0.0,
            state: PlaybackState::Idle,
            sink: None,
            frame: Frame::empty(),
            signals,
        }
    }

    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    /// Attach the drawing surface.
    pub fn set_sink(&mut self, sink: impl FrameSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Detach the drawing surface. Ticks keep advancing without one.
    pub fn take_sink(&mut self) -> Option<Box<dyn FrameSink>> {
        self.sink.take()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackSignal> {
        self.signals.subscribe()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn is_loaded(&self) -> bool {
        self.events.is_some()
    }

    /// Cursor position as a fraction of the recorded span.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Recording time under the cursor, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        (self.cursor * self.span_ms as f64).round() as u64
    }

    /// Recorded span of the loaded log, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.is_loaded() {
            self.span_ms
        } else {
            0
        }
    }

    /// The last frame produced by a tick, seek or load.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn events(&self) -> Option<&Arc<[Event]>> {
        self.events.as_ref()
    }

    /// Load a log, replacing whatever was loaded, and draw its start.
    pub fn load(&mut self, events: impl Into<Arc<[Event]>>) {
        let events: Arc<[Event]> = events.into();
        self.span_ms = total_span(&events);
        let count = events.len();
        self.events = Some(events);
        self.cursor = 0.0;
        self.state = PlaybackState::Ready;
        tracing::debug!(events = count, span_ms = self.span_ms, "playback loaded");
        self.emit(PlaybackSignal::Loaded {
            events: count,
            span_ms: self.span_ms,
        });
        self.render_current();
    }

    /// Start or resume. Playing a finished log starts it over.
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                tracing::warn!("play requested with nothing loaded");
                return;
            }
            PlaybackState::Running => return,
            PlaybackState::Finished => self.cursor = 0.0,
            PlaybackState::Ready | PlaybackState::Paused => {}
        }
        self.reanchor();
        self.state = PlaybackState::Running;
        tracing::debug!(cursor = self.cursor, rate = self.rate, "playback started");
        self.emit(PlaybackSignal::Started);
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Running {
            return;
        }
        self.cursor = self.cursor_now();
        self.state = PlaybackState::Paused;
        tracing::debug!(cursor = self.cursor, "playback paused");
        self.emit(PlaybackSignal::Paused);
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the cursor to `fraction` (clamped to `[0, 1]`) and draw it.
    ///
    /// A running scheduler keeps running from the new position. Otherwise
    /// the scheduler ends up paused, or finished when seeking to the end.
    pub fn seek(&mut self, fraction: f64) {
        if self.state == PlaybackState::Idle {
            tracing::trace!("seek ignored, nothing loaded");
            return;
        }
        if fraction.is_nan() {
            tracing::warn!("seek to NaN ignored");
            return;
        }
        self.cursor = fraction.clamp(0.0, 1.0);
        if self.is_running() {
            self.reanchor();
        } else if self.cursor >= 1.0 {
            self.state = PlaybackState::Finished;
        } else {
            self.state = PlaybackState::Paused;
        }
        self.emit(PlaybackSignal::Seeked(self.cursor));
        self.render_current();
    }

    /// Change the playback rate, clamped to [`MIN_RATE`]..=[`MAX_RATE`].
    ///
    /// Returns `false` and leaves the rate alone for non-finite or
    /// non-positive input.
    pub fn set_rate(&mut self, rate: f64) -> bool {
        let Some(rate) = sanitize_rate(rate) else {
            tracing::warn!(rate, "rejected playback rate");
            return false;
        };
        if self.is_running() {
            self.cursor = self.cursor_now();
            self.rate = rate;
            self.reanchor();
        } else {
            self.rate = rate;
        }
        tracing::debug!(rate, cursor = self.cursor, "playback rate changed");
        self.emit(PlaybackSignal::RateChanged(rate));
        true
    }

    /// Advance the cursor to the current time and render.
    ///
    /// Returns the rendered frame, or `None` when not running.
    pub fn tick(&mut self) -> Option<Frame> {
        if !self.is_running() {
            return None;
        }
        self.cursor = self.cursor_now();
        let reached_end = self.cursor >= 1.0;
        tracing::trace!(cursor = self.cursor, "playback tick");
        self.render_current();
        let frame = self.frame.clone();

        if reached_end {
            if self.config.loop_playback {
                tracing::debug!("playback looping");
                self.cursor = 0.0;
                self.reanchor();
            } else {
                self.state = PlaybackState::Finished;
                tracing::debug!("playback finished");
                self.emit(PlaybackSignal::Finished);
            }
        }
        Some(frame)
    }

    /// Step one frame forward, pausing if running.
    pub fn step_forward(&mut self) {
        self.step(1.0);
    }

    /// Step one frame back, pausing if running.
    pub fn step_back(&mut self) {
        self.step(-1.0);
    }

    fn step(&mut self, direction: f64) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.pause();
        let delta = self.config.frame_duration_ms() * self.rate / self.span_ms as f64;
        self.seek(self.cursor + direction * delta);
    }

    /// Unload the log and return to `Idle`. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == PlaybackState::Idle && self.events.is_none() {
            return;
        }
        self.events = None;
        self.span_ms = 1;
        self.cursor = 0.0;
        self.state = PlaybackState::Idle;
        tracing::debug!("playback closed");
        self.emit(PlaybackSignal::Closed);
    }

    pub fn stop(&mut self) {
        self.close();
    }

    /// Reconstruct the frame at `fraction` of the loaded log.
    pub fn frame_at(&self, fraction: f64) -> Frame {
        match &self.events {
            Some(events) => reconstruct_from_snapshot(events, fraction),
            None => Frame::empty(),
        }
    }

    fn now_ms(&self) -> f64 {
        self.clock.now().as_millis() as f64
    }

    fn reanchor(&mut self) {
        self.anchor_ms = self.now_ms() - self.cursor * self.span_ms as f64 / self.rate;
    }

    fn cursor_now(&self) -> f64 {
        let elapsed = (self.now_ms() - self.anchor_ms) * self.rate;
        (elapsed / self.span_ms as f64).clamp(0.0, 1.0)
    }

    fn render_current(&mut self) {
        self.frame = self.frame_at(self.cursor);
        match self.sink.as_mut() {
            Some(sink) => sink.render(&self.frame),
            None => tracing::trace!("no render surface, frame skipped"),
        }
    }

    fn emit(&self, signal: PlaybackSignal) {
        // No subscribers is fine.
        let _ = self.signals.send(signal);
    }
}

pub(crate) fn sanitize_rate(rate: f64) -> Option<f64> {
    (rate.is_finite() && rate > 0.0).then(|| rate.clamp(MIN_RATE, MAX_RATE))
}

/// Format milliseconds as `m:ss`.
pub fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use scribe_core::{ManualClock, Timestamp};
    use tokio::sync::broadcast::error::TryRecvError;

    #[derive(Default)]
    struct Recording(Vec<String>);

    impl FrameSink for Recording {
        fn render(&mut self, frame: &Frame) {
            self.0.push(frame.text.clone());
        }
    }

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn scenario() -> Vec<Event> {
        vec![
            Event::insert(ts(0), 0, "H"),
            Event::insert(ts(100), 1, "i"),
            Event::delete(ts(200), 0, 1),
        ]
    }

    /// Two keystrokes one second apart.
    fn one_second() -> Vec<Event> {
        vec![Event::insert(ts(0), 0, "a"), Event::insert(ts(1000), 1, "b")]
    }

    fn setup(config: PlaybackConfig) -> (PlaybackScheduler, Arc<ManualClock>, Arc<Mutex<Recording>>) {
        let clock = Arc::new(ManualClock::new(ts(50_000)));
        let sink = Arc::new(Mutex::new(Recording::default()));
        let scheduler = PlaybackScheduler::new(config, clock.clone()).with_sink(sink.clone());
        (scheduler, clock, sink)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_lifecycle() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        assert_eq!(player.state(), PlaybackState::Idle);

        player.play();
        assert_eq!(player.state(), PlaybackState::Idle);

        player.load(scenario());
        assert_eq!(player.state(), PlaybackState::Ready);
        assert_eq!(player.duration_ms(), 200);

        player.play();
        assert_eq!(player.state(), PlaybackState::Running);

        clock.advance(100);
        let frame = player.tick().unwrap();
        assert_eq!(frame.text, "Hi");
        assert!(approx(player.cursor(), 0.5));

        clock.advance(100);
        assert_eq!(player.tick().unwrap().text, "i");
        assert_eq!(player.state(), PlaybackState::Finished);
        assert!(player.tick().is_none());
    }

    #[test]
    fn test_pause_holds_cursor() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        player.load(one_second());
        player.play();

        clock.advance(250);
        player.pause();
        clock.advance(10_000);
        assert!(player.tick().is_none());
        assert!(approx(player.cursor(), 0.25));

        player.play();
        clock.advance(250);
        player.tick();
        assert!(approx(player.cursor(), 0.5));
    }

    #[test]
    fn test_rate_change_is_continuous() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        player.load(one_second());
        player.play();

        clock.advance(400);
        player.tick();
        assert!(approx(player.cursor(), 0.4));

        assert!(player.set_rate(2.0));
        player.tick();
        assert!(approx(player.cursor(), 0.4));

        clock.advance(100);
        player.tick();
        assert!(approx(player.cursor(), 0.6));
    }

    #[test]
    fn test_rate_change_without_tick_in_between() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        player.load(one_second());
        player.play();

        clock.advance(400);
        player.set_rate(2.0);
        player.tick();
        assert!(approx(player.cursor(), 0.4));
    }

    #[test]
    fn test_rate_validation() {
        let (mut player, _, _) = setup(PlaybackConfig::default());
        assert!(!player.set_rate(0.0));
        assert!(!player.set_rate(-2.0));
        assert!(!player.set_rate(f64::NAN));
        assert!(!player.set_rate(f64::INFINITY));
        assert_eq!(player.rate(), 1.0);

        assert!(player.set_rate(100.0));
        assert_eq!(player.rate(), MAX_RATE);
        assert!(player.set_rate(0.01));
        assert_eq!(player.rate(), MIN_RATE);
        for rate in PRESET_RATES {
            assert!(player.set_rate(rate));
            assert_eq!(player.rate(), rate);
        }
    }

    #[test]
    fn test_scrub_while_paused_renders_immediately() {
        let (mut player, _, sink) = setup(PlaybackConfig::default());
        player.load(scenario());
        sink.lock().0.clear();

        player.seek(0.5);
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(sink.lock().0, vec!["Hi".to_string()]);

        player.seek(7.0);
        assert_eq!(player.state(), PlaybackState::Finished);
        assert!(approx(player.cursor(), 1.0));
        assert_eq!(player.frame().text, "i");
    }

    #[test]
    fn test_seek_while_running_continues_from_new_position() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        player.load(one_second());
        player.play();
        clock.advance(100);

        player.seek(0.8);
        assert!(player.is_running());
        clock.advance(100);
        player.tick();
        assert!(approx(player.cursor(), 0.9));
    }

    #[test]
    fn test_finish_signal_and_restart() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        let mut signals = player.subscribe();
        player.load(scenario());
        player.play();
        clock.advance(500);
        player.tick();

        let received: Vec<PlaybackSignal> = std::iter::from_fn(|| signals.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                PlaybackSignal::Loaded {
                    events: 3,
                    span_ms: 200
                },
                PlaybackSignal::Started,
                PlaybackSignal::Finished,
            ]
        );

        player.play();
        assert!(player.is_running());
        assert!(approx(player.cursor(), 0.0));
    }

    #[test]
    fn test_loop_playback() {
        let (mut player, clock, _) = setup(PlaybackConfig::default().with_loop(true));
        player.load(one_second());
        player.play();

        clock.advance(1_500);
        assert_eq!(player.tick().unwrap().text, "ab");
        assert!(player.is_running());
        assert!(approx(player.cursor(), 0.0));

        clock.advance(500);
        player.tick();
        assert!(approx(player.cursor(), 0.5));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        let mut signals = player.subscribe();
        player.load(scenario());
        player.play();

        player.close();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_loaded());
        clock.advance(100);
        assert!(player.tick().is_none());

        let closed = std::iter::from_fn(|| signals.try_recv().ok())
            .filter(|s| *s == PlaybackSignal::Closed)
            .count();
        assert_eq!(closed, 1);
        assert!(matches!(signals.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_tick_without_sink_still_advances() {
        let clock = Arc::new(ManualClock::new(ts(0)));
        let mut player = PlaybackScheduler::new(PlaybackConfig::default(), clock.clone());
        player.load(scenario());
        player.play();
        clock.advance(100);
        assert_eq!(player.tick().unwrap().text, "Hi");
    }

    #[test]
    fn test_empty_log_plays_blank() {
        let (mut player, clock, _) = setup(PlaybackConfig::default());
        player.load(Vec::new());
        player.play();
        clock.advance(10);
        assert_eq!(player.tick().unwrap(), Frame::empty());
        assert_eq!(player.state(), PlaybackState::Finished);
    }

    #[test]
    fn test_frame_stepping() {
        // 10 fps, so one frame is 100ms of a 1000ms recording.
        let (mut player, clock, _) = setup(PlaybackConfig::default().with_fps(10));
        player.load(one_second());
        player.play();
        clock.advance(500);

        player.step_forward();
        assert_eq!(player.state(), PlaybackState::Paused);
        assert!(approx(player.cursor(), 0.6));

        player.step_back();
        player.step_back();
        assert!(approx(player.cursor(), 0.4));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65_432), "1:05");
        assert_eq!(format_clock(600_000), "10:00");
    }
}
