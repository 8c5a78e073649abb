//! Error types for the logline pipeline.

use crate::types::LogType;
use thiserror::Error;

/// Boxed error returned by collaborators (stores, senders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline error type.
///
/// Everything here is a configuration error surfaced synchronously from
/// `start` or `send`. Delivery failures never reach the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `send` was called before `start` (or after `stop`)
    #[error("pipeline is not started; call start(config) first")]
    NotStarted,

    /// `start` was called while already running
    #[error("pipeline is already started")]
    AlreadyStarted,

    /// No destination accepts this log type and no default destination is set
    #[error("no destination is mapped for log type {0}")]
    UnmappedLogType(LogType),

    /// The serializer could not encode the event
    #[error("serialization failed: {0}")]
    Serialization(#[from] SerializeError),

    /// The configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called outside a Tokio runtime
    #[error("pipeline must be started from within a Tokio runtime")]
    NoRuntime,

    /// The runner's queue is closed (its consumer task is gone)
    #[error("pipeline queue is closed")]
    QueueClosed,
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Serializer error type.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other serializer-specific failure
    #[error("{0}")]
    Other(String),
}

/// Store error type.
///
/// Concrete stores wrap their own errors; the runner never retries them.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O failure in the underlying store
    #[error("store I/O error: {0}")]
    Io(#[source] BoxError),
}

impl StoreError {
    /// Wraps a concrete store error.
    pub fn io(err: impl Into<BoxError>) -> Self {
        Self::Io(err.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
