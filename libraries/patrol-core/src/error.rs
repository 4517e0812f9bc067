/// Core error types for the patrol queue
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Unknown queue item kind tag
    #[error("Unknown item kind: {0}")]
    UnknownKind(String),

    /// Payload did not match the shape expected for its kind
    #[error("Invalid payload for {kind}: {message}")]
    InvalidPayload { kind: String, message: String },

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an invalid payload error
    pub fn invalid_payload(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a rejected remote delivery.
///
/// The sync engine does not look inside the message; it only needs to know
/// whether retrying could ever succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Network error, timeout or server-side failure. Retried on the next pass.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// The remote rejected the item itself (validation, unknown checkpoint...).
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Create a transient failure
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a permanent failure
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// The failure description without the classification prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(msg) | Self::Permanent(msg) => msg,
        }
    }
}
