use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised while building or submitting Cloud Tasks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Payload is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("No handler URL configured and no root URL available")]
    HandlerUnresolved,

    #[error("Cloud Tasks call failed: {0}")]
    Remote(String),
}

impl QueueError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a remote-call error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
