//! Per-frame task that ticks a shared scheduler.

use super::{PlaybackScheduler, PlaybackSignal, PlaybackState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Explicit start/stop lifecycle around a [`PlaybackScheduler`].
///
/// The task ticks at the configured fps until the scheduler is closed or
/// [`stop`](Self::stop) is called.
pub struct PlaybackDriver {
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    signals: broadcast::Receiver<PlaybackSignal>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    /// Spawn the tick task on the current tokio runtime.
    pub fn start(scheduler: Arc<Mutex<PlaybackScheduler>>) -> Self {
        let (period, signals) = {
            let guard = scheduler.lock();
            let period = Duration::from_secs_f64(guard.config().frame_duration_ms() / 1000.0);
            (period, guard.subscribe())
        };

        let shared = scheduler.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mut scheduler = shared.lock();
                if scheduler.state() == PlaybackState::Idle {
                    tracing::debug!("scheduler closed, driver exiting");
                    break;
                }
                scheduler.tick();
            }
        });

        Self {
            scheduler,
            signals,
            task: Some(task),
        }
    }

    pub fn scheduler(&self) -> &Arc<Mutex<PlaybackScheduler>> {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait until playback reaches the end.
    ///
    /// Returns `false` if the scheduler was closed first.
    pub async fn finished(&mut self) -> bool {
        loop {
            match self.signals.recv().await {
                Ok(PlaybackSignal::Finished) => return true,
                Ok(PlaybackSignal::Closed) | Err(RecvError::Closed) => return false,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::trace!(skipped, "driver lagged behind playback signals");
                }
            }
        }
    }

    /// Close the scheduler and cancel the task. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            // Closing first means a tick already waiting on the lock sees Idle.
            self.scheduler.lock().close();
            task.abort();
            tracing::debug!("playback driver stopped");
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
