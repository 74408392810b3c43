use thiserror::Error;

use crate::client::ClientError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Missing submission base URL")]
    MissingSubmissionBaseUrl,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ResourceError>;
