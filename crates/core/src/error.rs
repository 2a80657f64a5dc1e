use thiserror::Error;

/// Top-level error type for the Warden primitives.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("state error: {0}")]
    State(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
