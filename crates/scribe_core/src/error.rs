//! Error types

use thiserror::Error;

/// Errors surfaced by the scribe crates.
///
/// None of these are fatal to a host application: ingestion degrades to a
/// dropped event, decoding degrades to an empty log.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// The ingestion worker has shut down and can no longer accept commands
    #[error("event log worker is not running")]
    WorkerClosed,

    /// A color string could not be parsed
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// An event dump could not be decoded
    #[error("failed to decode event dump: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;
