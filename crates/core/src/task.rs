//! Delayed task envelope.
//!
//! A task is stored as one sorted-set member: a JSON object carrying the task
//! id and the base64-encoded payload. The id makes every member unique, so
//! two tasks with identical payloads never collapse into one member.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of an enqueued task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors decoding a stored task member.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed task envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// A unit of deferred work: an id plus opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedTask {
    pub id: TaskId,
    pub payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    id: TaskId,
    payload: String,
}

impl DelayedTask {
    /// Wrap `payload` under a freshly generated id.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: TaskId::generate(),
            payload: payload.into(),
        }
    }

    /// Serialize into the sorted-set member form.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        let envelope = Envelope {
            id: self.id.clone(),
            payload: STANDARD.encode(&self.payload),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse a sorted-set member back into a task.
    pub fn decode(member: &str) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_str(member)?;
        let payload = STANDARD.decode(envelope.payload.as_bytes())?;
        Ok(Self {
            id: envelope.id,
            payload,
        })
    }
}
