//! Error types for the store

use thiserror::Error;
use types::EntityKind;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded or decoded
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    /// Guides have their own table and typed accessors
    #[error("{0} are not stored as generic catalog entities")]
    UnsupportedKind(EntityKind),
}
