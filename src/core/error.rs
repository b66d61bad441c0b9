use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`QueryEngine`](crate::engine::QueryEngine).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Query engine unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed ({name}): {message}")]
    Remote { name: String, message: String },

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid connection configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn remote(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failure reading or writing the control table. Both kinds abort a run.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Control table unavailable: {0}")]
    Unavailable(#[from] EngineError),

    #[error("Control table schema error: {0}")]
    Schema(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-operation failure. Surfaces in the run report, never aborts a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationFailure {
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    #[error("{0}")]
    Remote(#[from] EngineError),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Unavailable(EngineError::Unavailable(err.to_string()))
    }
}
