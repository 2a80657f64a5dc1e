use thiserror::Error;

use warden_core::{EnvelopeError, WardenError};

/// Errors from store-backed coordination operations.
///
/// Contention is never an error: a held lock, a lost claim, or an exceeded
/// limit are all reported through ordinary return values.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<EnvelopeError> for StateError {
    fn from(err: EnvelopeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<StateError> for WardenError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Serialization(msg) => Self::Serialization(msg),
            other => Self::State(other.to_string()),
        }
    }
}
