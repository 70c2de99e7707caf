//! The log worker task and its command protocol.

use scribe_core::{Event, EventLog, LogConfig, LogStats, Result, ScribeError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Commands understood by the log worker.
#[derive(Debug)]
pub enum LogCommand {
    /// Append an edit, style or snapshot event.
    Append(Event),
    /// Reply with the full ordered event sequence.
    Dump(oneshot::Sender<Vec<Event>>),
    /// Reply with diagnostic counters.
    Stats(oneshot::Sender<LogStats>),
    /// Empty the log. No reply.
    Clear,
}

/// Owns the [`EventLog`] and applies commands in arrival order.
pub struct LogWorker {
    log: EventLog,
    rx: mpsc::Receiver<LogCommand>,
}

impl LogWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The task ends once every [`LogHandle`] is dropped; its output is the
    /// final state of the log.
    pub fn spawn(config: &LogConfig) -> (LogHandle, JoinHandle<EventLog>) {
        let (handle, worker) = Self::new(config);
        let task = tokio::spawn(worker.run());
        (handle, task)
    }

    /// Create a worker without spawning it.
    pub fn new(config: &LogConfig) -> (LogHandle, Self) {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let worker = Self {
            log: EventLog::from_config(config),
            rx,
        };
        (LogHandle { tx }, worker)
    }

    /// Process commands until all senders are gone.
    pub async fn run(mut self) -> EventLog {
        tracing::debug!(capacity = self.log.capacity(), "event log worker started");
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        tracing::debug!(len = self.log.len(), "event log worker stopped");
        self.log
    }

    fn handle(&mut self, command: LogCommand) {
        match command {
            LogCommand::Append(event) => {
                tracing::trace!(kind = event.kind(), time = %event.time(), "append");
                self.log.append(event);
            }
            LogCommand::Dump(reply) => {
                // The requester may have given up waiting; that is fine.
                let _ = reply.send(self.log.dump());
            }
            LogCommand::Stats(reply) => {
                let _ = reply.send(self.log.stats());
            }
            LogCommand::Clear => {
                tracing::debug!(dropped = self.log.len(), "clearing event log");
                self.log.clear();
            }
        }
    }
}

/// Cloneable sender side of the log worker.
#[derive(Clone, Debug)]
pub struct LogHandle {
    tx: mpsc::Sender<LogCommand>,
}

impl LogHandle {
    /// Send a raw command, waiting for queue space.
    pub async fn send(&self, command: LogCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| {
            tracing::warn!("attempted to send to a stopped event log worker");
            ScribeError::WorkerClosed
        })
    }

    /// Append an event.
    pub async fn append(&self, event: Event) -> Result<()> {
        self.send(LogCommand::Append(event)).await
    }

    /// Fetch an immutable copy of the ordered event sequence.
    pub async fn dump(&self) -> Result<Vec<Event>> {
        let (reply, rx) = oneshot::channel();
        self.send(LogCommand::Dump(reply)).await?;
        rx.await.map_err(|_| ScribeError::WorkerClosed)
    }

    /// Fetch diagnostic counters.
    pub async fn stats(&self) -> Result<LogStats> {
        let (reply, rx) = oneshot::channel();
        self.send(LogCommand::Stats(reply)).await?;
        rx.await.map_err(|_| ScribeError::WorkerClosed)
    }

    /// Empty the log.
    pub async fn clear(&self) -> Result<()> {
        self.send(LogCommand::Clear).await
    }

    /// Whether the worker has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
