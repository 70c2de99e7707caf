//! Periodic sampling of the typed-character counter.

use super::RollingWpm;
use parking_lot::{Mutex, RwLock};
use scribe_core::TextStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The current document text, shared with whoever owns the editor.
pub type SharedText = Arc<RwLock<String>>;

/// Shared count of characters typed this session.
#[derive(Clone, Debug, Default)]
pub struct TypedCounter(Arc<AtomicU64>);

impl TypedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        if n > 0 {
            self.0.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Restart the count. The metric resets itself when it sees the drop.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Figures published for the metrics display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsUpdate {
    pub wpm: u32,
    pub best_wpm: u32,
    pub chars: usize,
    pub words: usize,
}

/// Repeating task that feeds the rolling metric on a fixed cadence.
pub struct MetricSampler;

impl MetricSampler {
    /// Start sampling every `interval` on the current tokio runtime.
    ///
    /// Each tick calls [`RollingWpm::add_sample`] with the counter's value,
    /// even when it has not changed, so the rate decays while idle.
    pub fn start(
        metric: Arc<Mutex<RollingWpm>>,
        counter: TypedCounter,
        text: SharedText,
        interval: Duration,
    ) -> SamplerHandle {
        let (tx, rx) = watch::channel(MetricsUpdate::default());
        let interval = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (wpm, best_wpm) = {
                    let mut metric = metric.lock();
                    metric.add_sample(counter.get());
                    (metric.current_rate(), metric.best_rate())
                };
                let stats = TextStats::of(&text.read());
                let update = MetricsUpdate {
                    wpm,
                    best_wpm,
                    chars: stats.chars,
                    words: stats.words,
                };
                if tx.send(update).is_err() {
                    tracing::debug!("no metrics listeners left, sampler exiting");
                    break;
                }
            }
        });

        SamplerHandle {
            updates: rx,
            task: Some(task),
        }
    }
}

/// Owner of a running [`MetricSampler`] task.
pub struct SamplerHandle {
    updates: watch::Receiver<MetricsUpdate>,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Subscribe to metric updates.
    pub fn updates(&self) -> watch::Receiver<MetricsUpdate> {
        self.updates.clone()
    }

    /// The most recent update.
    pub fn latest(&self) -> MetricsUpdate {
        *self.updates.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the repeating task. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("metric sampler stopped");
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
