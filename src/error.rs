//! Service error taxonomy. Validation and action errors surface as client
//! errors; store errors fail the enclosing request unless a caller opts into
//! a fail-soft boolean result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// The auth action selector was not recognized.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Underlying SQLite failure.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }
}
