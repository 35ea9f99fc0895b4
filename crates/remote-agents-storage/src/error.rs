//! Storage error type.

use thiserror::Error;

/// A durability failure in either storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage not initialized: call init() first")]
    NotInitialized,
}

impl From<StorageError> for remote_agents_core::CoreError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
