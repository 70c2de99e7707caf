//! Smoothed words-per-minute over a sliding window.

use scribe_core::{Clock, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Configuration for the rolling typing-speed metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Width of the sample window in milliseconds.
    pub window_ms: u64,
    /// Weight of the newest instantaneous rate in the moving average.
    pub alpha: f64,
    /// Characters per word.
    pub chars_per_word: u32,
    /// How often the sampler re-reads the typed-character counter.
    pub sample_interval_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_ms: 5_000,
            alpha: 0.2,
            chars_per_word: 5,
            sample_interval_ms: 250,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    time: Timestamp,
    typed: u64,
}

/// Live words-per-minute from a monotonically growing count of typed characters.
///
/// Samples are only stored when the count changes, so an idle stretch does
/// not water the rate down. Every call still evicts samples older than the
/// window; once fewer than two remain, each call decays the estimate toward
/// zero. Callers are expected to sample on a fixed cadence shorter than the
/// window (see [`MetricSampler`](super::MetricSampler)).
pub struct RollingWpm {
    config: MetricsConfig,
    clock: Arc<dyn Clock>,
    samples: VecDeque<Sample>,
    ema: Option<f64>,
    last_typed: Option<u64>,
    stored: u64,
    best: u32,
}

impl RollingWpm {
    pub fn new(config: MetricsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            samples: VecDeque::new(),
            ema: None,
            last_typed: None,
            stored: 0,
            best: 0,
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Feed the current typed-character count.
    pub fn add_sample(&mut self, typed: u64) {
        if self.last_typed.is_some_and(|last| typed < last) {
            tracing::debug!(typed, "typed counter went backwards, resetting metric");
            self.reset();
        }

        let now = self.clock.now();
        let horizon = Timestamp::from_millis(now.as_millis().saturating_sub(self.config.window_ms));
        while self.samples.front().is_some_and(|s| s.time < horizon) {
            self.samples.pop_front();
        }

        let changed = self.last_typed != Some(typed);
        if changed {
            self.samples.push_back(Sample { time: now, typed });
            self.last_typed = Some(typed);
            self.stored += 1;
        }

        if self.samples.len() >= 2 {
            if changed {
                let instant = self.window_rate();
                self.fold(instant);
            }
        } else if self.ema.is_some() {
            self.fold(0.0);
        }

        self.best = self.best.max(self.current_rate());
    }

    /// Rate between the oldest and newest sample in the window.
    fn window_rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let delta_chars = last.typed.saturating_sub(first.typed) as f64;
        let delta_minutes = (last.time.saturating_sub(first.time) as f64 / 60_000.0).max(1e-3);
        (delta_chars / self.config.chars_per_word.max(1) as f64) / delta_minutes
    }

    fn fold(&mut self, instant: f64) {
        let alpha = self.config.alpha.clamp(0.0, 1.0);
        self.ema = Some(match self.ema {
            Some(ema) => alpha * instant + (1.0 - alpha) * ema,
            None => instant,
        });
    }

    /// Smoothed words per minute, rounded.
    pub fn current_rate(&self) -> u32 {
        if self.stored < 2 || self.last_typed.unwrap_or(0) == 0 {
            return 0;
        }
        self.ema.map(|ema| ema.max(0.0).round() as u32).unwrap_or(0)
    }

    /// Highest rate reported since the last reset.
    pub fn best_rate(&self) -> u32 {
        self.best
    }

    /// Forget all samples, e.g. when the session's counter restarts.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.ema = None;
        self.last_typed = None;
        self.stored = 0;
        self.best = 0;
    }
}
