//! Task outcome types.

use std::fmt;
use thiserror::Error;

/// Kind of change a synchronization task applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOp::Create => f.write_str("create"),
            SyncOp::Update => f.write_str("update"),
            SyncOp::Delete => f.write_str("delete"),
        }
    }
}

/// Error type for task processing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Remote API call failed
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// Internal error (limiter closed, task panicked)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TaskError {
    /// Wraps any remote error, keeping its message verbatim.
    pub fn from_remote(err: impl fmt::Display) -> Self {
        TaskError::Remote {
            message: err.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TaskError::Internal {
            message: message.into(),
        }
    }
}

/// Result type for task processing.
pub type TaskResult<T> = Result<T, TaskError>;
