//! Error types for the patrol server client.

use patrol_core::DeliveryError;
use thiserror::Error;

/// Errors that can occur when talking to the patrol server.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Queue item kind this client has no endpoint for
    #[error("No endpoint for item kind: {0}")]
    UnsupportedKind(String),
}

impl ServerClientError {
    /// Whether sending the same request again could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder(),
            Self::ServerError { status, .. } => is_retryable_status(*status),
            Self::InvalidUrl(_) | Self::UnsupportedKind(_) => false,
        }
    }
}

/// 408, 425, 429 and 5xx are worth retrying; any other 4xx is not
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429) || (500..600).contains(&status)
}

impl From<ServerClientError> for DeliveryError {
    fn from(err: ServerClientError) -> Self {
        if err.is_retryable() {
            DeliveryError::transient(err.to_string())
        } else {
            DeliveryError::permanent(err.to_string())
        }
    }
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status: u16) -> ServerClientError {
        ServerClientError::ServerError {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_status_classification() {
        for status in [408, 425, 429, 500, 502, 503, 504] {
            assert!(server_error(status).is_retryable(), "{status} should be retried");
        }
        for status in [400, 401, 403, 404, 410, 422] {
            assert!(!server_error(status).is_retryable(), "{status} should not be retried");
        }
    }

    #[test]
    fn test_into_delivery_error() {
        let err: DeliveryError = server_error(503).into();
        assert!(!err.is_permanent());

        let err: DeliveryError = server_error(422).into();
        assert!(err.is_permanent());
        assert!(err.message().contains("422"));
    }

    #[test]
    fn test_local_errors_are_permanent() {
        let err: DeliveryError = ServerClientError::InvalidUrl("not a url".into()).into();
        assert!(err.is_permanent());

        let err: DeliveryError = ServerClientError::UnsupportedKind("photo".into()).into();
        assert!(err.is_permanent());
    }
}
