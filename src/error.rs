//! Error types for COUNTER reporting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Inconsistent data set - {0}")]
    InconsistentData(String),
    #[error("COUNTER reports are not enabled or not ready")]
    NotReady,
    #[error("Migration error: {0}")]
    Migration(String),
}

impl CounterError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CounterError::InvalidArgument(message.into())
    }

    /// Whether this error was caused by bad caller input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CounterError::InvalidArgument(_))
    }
}
