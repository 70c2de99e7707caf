//! Subcommand implementations.

use crate::config::ScribeConfig;
use crate::ffmpeg::FfmpegTranscoder;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use scribe_core::{
    decode_events, encode_events, reconstruct_at, Clock, Event, EventLog, Frame, LogConfig,
    ManualClock, SystemClock, TextStats, Timestamp,
};
use scribe_recorder::replay::format_clock;
use scribe_recorder::{
    EditOp, ExportFormat, ExportSession, FrameSink, LogWorker, MetricsConfig, PlaybackDriver,
    PlaybackScheduler, Recorder, RenderConfig, RenderedFrame, RollingWpm, TextLayout, TypedCounter,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Input problems reported to the user
#[derive(Error, Debug)]
pub enum CommandError {
    /// The dump decoded but holds no events
    #[error("{0} contains no events")]
    EmptyDump(PathBuf),

    /// A cursor position outside the recorded span
    #[error("position {0} is outside 0..=1")]
    Fraction(f64),

    /// A typing speed of zero
    #[error("--cpm must be greater than zero")]
    ZeroSpeed,
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let events =
        decode_events(&json).with_context(|| format!("Failed to decode {}", path.display()))?;
    tracing::debug!(events = events.len(), path = %path.display(), "loaded event dump");
    Ok(events)
}

/// `scribe record`: type stdin into a fresh log at a steady pace.
pub async fn record(config: &ScribeConfig, out: Option<&Path>, cpm: u64) -> Result<()> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;

    let events = record_text(&text, cpm, SystemClock.now(), &config.log).await?;
    let json = encode_events(&events)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(events = events.len(), path = %path.display(), "wrote event dump");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Record `text` one character at a time, `60_000 / cpm` ms apart, with a
/// snapshot after every line.
pub async fn record_text(
    text: &str,
    cpm: u64,
    start: Timestamp,
    log_config: &LogConfig,
) -> Result<Vec<Event>> {
    if cpm == 0 {
        return Err(CommandError::ZeroSpeed.into());
    }
    let per_char = 60_000 / cpm;
    let clock = Arc::new(ManualClock::new(start));
    let (log, worker) = LogWorker::spawn(log_config);
    let recorder = Recorder::new(log.clone(), clock.clone());

    let mut typed = String::new();
    for (position, ch) in text.chars().enumerate() {
        recorder
            .record_edit(EditOp::insert(position as i64, ch.to_string()))
            .await?;
        typed.push(ch);
        if ch == '\n' {
            recorder.record_snapshot(typed.as_str()).await?;
        }
        clock.advance(per_char);
    }

    let events = log.dump().await?;
    let stats = log.stats().await?;
    if stats.evicted > 0 {
        tracing::warn!(evicted = stats.evicted, "log capacity exceeded, oldest events dropped");
    }
    drop(recorder);
    drop(log);
    worker.await.context("event log worker panicked")?;
    Ok(events)
}

/// `scribe show`: print the document at a point in the recording.
pub fn show(file: &Path, at: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&at) {
        return Err(CommandError::Fraction(at).into());
    }
    let events = read_events(file)?;
    let frame = reconstruct_at(&events, at);
    println!("{}", frame.text);
    eprintln!("{}", describe_style(&frame));
    Ok(())
}

fn describe_style(frame: &Frame) -> String {
    let mut line = format!("-- {} {}pt", frame.style.color, frame.style.size_pt);
    if let Some(gradient) = &frame.style.gradient {
        line.push_str(&format!(" gradient={gradient}"));
    }
    line
}

/// Redraws the terminal with each new frame.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    layout: TextLayout,
    last: Option<RenderedFrame>,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, config: RenderConfig) -> Self {
        Self {
            out,
            layout: TextLayout::new(config),
            last: None,
        }
    }

    fn draw(&mut self, rendered: &RenderedFrame) -> io::Result<()> {
        // Clear the screen and home the cursor.
        write!(self.out, "\x1b[2J\x1b[H")?;
        for line in rendered.visible_lines() {
            writeln!(self.out, "{}", line.text)?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> FrameSink for TerminalSink<W> {
    fn render(&mut self, frame: &Frame) {
        let rendered = self.layout.layout(frame);
        if self.last.as_ref() == Some(&rendered) {
            return;
        }
        if let Err(err) = self.draw(&rendered) {
            tracing::warn!(error = %err, "failed to draw frame");
        }
        self.last = Some(rendered);
    }
}

/// `scribe play`: replay a dump in the terminal in real time.
pub async fn play(
    config: &ScribeConfig,
    file: &Path,
    rate: Option<f64>,
    fps: Option<u32>,
) -> Result<()> {
    let events = read_events(file)?;
    if events.is_empty() {
        return Err(CommandError::EmptyDump(file.to_path_buf()).into());
    }

    let mut playback = config.playback.clone();
    if let Some(rate) = rate {
        playback = playback.with_rate(rate);
    }
    if let Some(fps) = fps {
        playback = playback.with_fps(fps);
    }
    let sink = TerminalSink::new(io::stdout(), config.render.clone());
    let mut scheduler = PlaybackScheduler::new(playback, Arc::new(SystemClock)).with_sink(sink);
    scheduler.load(events);
    let duration = scheduler.duration_ms();
    scheduler.play();

    let scheduler = Arc::new(Mutex::new(scheduler));
    let mut driver = PlaybackDriver::start(scheduler.clone());
    let finished = driver.finished().await;
    let (elapsed, rate) = {
        let scheduler = scheduler.lock();
        (scheduler.elapsed_ms(), scheduler.rate())
    };
    driver.stop();

    if finished {
        eprintln!("{} / {} at {rate}x", format_clock(elapsed), format_clock(duration));
    }
    Ok(())
}

/// A point on the replayed typing-speed curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WpmPoint {
    /// Milliseconds since the first event.
    pub offset_ms: u64,
    pub wpm: u32,
}

/// Feed the recorded keystrokes through the rolling metric at its sampling
/// cadence, continuing three windows past the last event so the idle decay
/// shows up at the end of the curve.
pub fn wpm_curve(events: &[Event], config: &MetricsConfig) -> (Vec<WpmPoint>, u32) {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return (Vec::new(), 0);
    };
    let start = first.time();
    let end = last.time().saturating_add(config.window_ms.saturating_mul(3));
    let step = config.sample_interval_ms.max(1);

    let keystrokes: Vec<Timestamp> = events
        .iter()
        .filter_map(|event| match event {
            Event::Insert { time, text, .. } if text.chars().count() == 1 => Some(*time),
            _ => None,
        })
        .collect();

    let clock = Arc::new(ManualClock::new(start));
    let mut metric = RollingWpm::new(config.clone(), clock.clone());
    let counter = TypedCounter::new();
    let mut next_key = 0;
    let mut curve = Vec::new();

    let mut now = start;
    while now <= end {
        clock.set(now);
        while next_key < keystrokes.len() && keystrokes[next_key] <= now {
            counter.add(1);
            next_key += 1;
        }
        metric.add_sample(counter.get());
        curve.push(WpmPoint {
            offset_ms: now.saturating_sub(start),
            wpm: metric.current_rate(),
        });
        now = now.saturating_add(step);
    }

    (curve, metric.best_rate())
}

/// `scribe wpm`: print the typing-speed curve once per second.
pub fn wpm(config: &ScribeConfig, file: &Path) -> Result<()> {
    let events = read_events(file)?;
    let (curve, best) = wpm_curve(&events, &config.metrics);
    for point in curve.iter().filter(|p| p.offset_ms % 1000 == 0) {
        println!("{:>6}  {:>4} wpm", format_clock(point.offset_ms), point.wpm);
    }
    println!("best: {best} wpm");
    Ok(())
}

/// Counts printed by `scribe stats`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub retained: usize,
    pub evicted: u64,
    pub span_ms: u64,
    pub by_kind: BTreeMap<&'static str, usize>,
    pub text: TextStats,
}

/// Load events into a log of the configured capacity and summarize it.
pub fn summarize(events: Vec<Event>, log_config: &LogConfig) -> Summary {
    let mut log = EventLog::from_config(log_config);
    log.extend(events);
    let stats = log.stats();
    let retained = log.dump();

    let mut by_kind = BTreeMap::new();
    for event in &retained {
        *by_kind.entry(event.kind()).or_insert(0) += 1;
    }
    let span_ms = match (stats.first, stats.last) {
        (Some(first), Some(last)) => last.saturating_sub(first),
        _ => 0,
    };

    Summary {
        retained: stats.len,
        evicted: stats.evicted,
        span_ms,
        by_kind,
        text: TextStats::of(&reconstruct_at(&retained, 1.0).text),
    }
}

/// `scribe stats`: log and text statistics for a dump.
pub fn stats(config: &ScribeConfig, file: &Path, json: bool) -> Result<()> {
    let summary = summarize(read_events(file)?, &config.log);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("events:   {} (evicted {})", summary.retained, summary.evicted);
    for (kind, count) in &summary.by_kind {
        println!("  {kind:<9}{count}");
    }
    println!("duration: {}", format_clock(summary.span_ms));
    println!("chars:    {}", summary.text.chars);
    println!("words:    {}", summary.text.words);
    Ok(())
}

/// `scribe export`: capture a dump at the export frame rate and encode it
/// with `ffmpeg`, printing progress notices as they arrive.
pub async fn export(
    config: &ScribeConfig,
    file: &Path,
    format: ExportFormat,
    out: Option<&Path>,
    rate: Option<f64>,
    ffmpeg: &Path,
) -> Result<PathBuf> {
    let events = read_events(file)?;
    if events.is_empty() {
        return Err(CommandError::EmptyDump(file.to_path_buf()).into());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<scribe_recorder::Notice>();
    let printer = tokio::spawn(async move {
        while let Some(notice) = rx.recv().await {
            eprintln!("{}", notice.message());
        }
    });

    let session = ExportSession::new(config.export.clone(), config.render.clone())
        .with_rate(rate.unwrap_or(config.playback.initial_rate))
        .with_notices(tx);
    let mut transcoder = FfmpegTranscoder::new(ffmpeg);
    let result = tokio::task::spawn_blocking(move || session.run(&events, format, &mut transcoder))
        .await
        .context("export task panicked")?;
    // The session owned the only sender, so the printer drains and stops.
    printer.await.context("notice printer panicked")?;
    let artifact = result?;

    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), mime = artifact.mime_type, "wrote export");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_text_paces_and_snapshots() {
        let events = record_text("ab\nc", 600, Timestamp::from_millis(0), &LogConfig::default())
            .await
            .unwrap();

        // Four insertions plus one snapshot after the newline.
        assert_eq!(events.len(), 5);
        assert_eq!(events[3], Event::snapshot(Timestamp::from_millis(201), "ab\n"));
        assert_eq!(events[4].time().as_millis(), 300);
        assert_eq!(reconstruct_at(&events, 1.0).text, "ab\nc");
    }

    #[tokio::test]
    async fn test_record_text_rejects_zero_speed() {
        let err = record_text("x", 0, Timestamp::zero(), &LogConfig::default())
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<CommandError>().is_some());
    }

    #[test]
    fn test_wpm_curve_rises_then_decays() {
        // 60 keystrokes at 200ms apart: 60 WPM.
        let events: Vec<Event> = (0..60)
            .map(|i| Event::insert(Timestamp::from_millis(i * 200), i as i64, "x"))
            .collect();
        let (curve, best) = wpm_curve(&events, &MetricsConfig::default());

        assert_eq!(curve.first().unwrap().wpm, 0);
        assert!(curve.iter().any(|p| p.wpm >= 55));
        assert!((55..=65).contains(&best));
        assert_eq!(curve.last().unwrap().wpm, 0);
    }

    #[test]
    fn test_wpm_curve_ignores_pastes() {
        let events = vec![
            Event::insert(Timestamp::from_millis(0), 0, "pasted paragraph"),
            Event::insert(Timestamp::from_millis(500), 16, "more pasted text"),
        ];
        let (_, best) = wpm_curve(&events, &MetricsConfig::default());
        assert_eq!(best, 0);
    }

    #[test]
    fn test_summary() {
        let events = vec![
            Event::insert(Timestamp::from_millis(0), 0, "hi"),
            Event::insert(Timestamp::from_millis(500), 2, " there"),
            Event::snapshot(Timestamp::from_millis(1_000), "hi there"),
            Event::delete(Timestamp::from_millis(61_000), 0, 3),
        ];
        let config = LogConfig {
            max_events: 3,
            ..LogConfig::default()
        };
        let summary = summarize(events, &config);

        assert_eq!(summary.retained, 3);
        assert_eq!(summary.evicted, 1);
        assert_eq!(summary.span_ms, 60_500);
        assert_eq!(summary.by_kind.get("snapshot"), Some(&1));
        assert_eq!(summary.by_kind.get("insert"), Some(&1));
        assert_eq!(summary.text, TextStats { chars: 5, words: 1 });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["evicted"], 1);
        assert_eq!(json["by_kind"]["delete"], 1);
        assert_eq!(json["text"]["words"], 1);
    }

    #[test]
    fn test_terminal_sink_skips_identical_frames() {
        let mut sink = TerminalSink::new(Vec::new(), RenderConfig::default());
        let frame = Frame {
            text: "hello".into(),
            ..Frame::empty()
        };
        sink.render(&frame);
        let written = sink.out.len();
        sink.render(&frame);
        assert_eq!(sink.out.len(), written);

        let output = String::from_utf8(sink.out.clone()).unwrap();
        assert!(output.ends_with("hello\n"));
    }

    #[tokio::test]
    async fn test_export_reports_missing_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("dump.json");
        let events = vec![
            Event::insert(Timestamp::from_millis(0), 0, "a"),
            Event::insert(Timestamp::from_millis(400), 1, "b"),
        ];
        std::fs::write(&dump, encode_events(&events).unwrap()).unwrap();
        let out = dir.path().join("out.mp4");

        let err = export(
            &ScribeConfig::default(),
            &dump,
            ExportFormat::Mp4,
            Some(&out),
            Some(2.0),
            Path::new("/nonexistent/bin/ffmpeg"),
        )
        .await
        .unwrap_err();

        assert!(err.downcast_ref::<scribe_recorder::ExportError>().is_some());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_export_rejects_empty_dump() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("empty.json");
        std::fs::write(&dump, encode_events(&[]).unwrap()).unwrap();

        let err = export(
            &ScribeConfig::default(),
            &dump,
            ExportFormat::Gif,
            None,
            None,
            Path::new("ffmpeg"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("contains no events"));
    }

    #[test]
    fn test_show_rejects_bad_fraction() {
        let err = show(Path::new("unused.json"), 1.5).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }
}
