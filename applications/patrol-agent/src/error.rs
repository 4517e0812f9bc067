/// Agent error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] patrol_storage::StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<patrol_sync::SyncError> for AgentError {
    fn from(err: patrol_sync::SyncError) -> Self {
        match err {
            patrol_sync::SyncError::Storage(e) => Self::Storage(e),
            patrol_sync::SyncError::InvalidPayload(msg) => Self::InvalidInput(msg),
            patrol_sync::SyncError::Config(msg) => Self::Config(msg),
        }
    }
}
