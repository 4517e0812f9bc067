use thiserror::Error;

/// Errors that can occur during capture and sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] patrol_storage::StorageError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid sync configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
