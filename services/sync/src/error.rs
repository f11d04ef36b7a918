//! Error types for the sync service

use pendo_adapter::PendoError;
use store::StoreError;
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Another run holds the sync guard
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    #[error("Pendo API error: {0}")]
    Api(#[from] PendoError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid sync schedule '{expression}': {message}")]
    Schedule { expression: String, message: String },
}
