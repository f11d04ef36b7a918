//! Error types for the dashboard API

use store::StoreError;
use sync_service::SyncError;
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::NotFound { .. } => StatusCode::NOT_FOUND,
            DashboardError::Sync(SyncError::AlreadyRunning) => StatusCode::CONFLICT,
            DashboardError::Configuration { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl warp::reject::Reject for DashboardError {}

pub type Result<T> = std::result::Result<T, DashboardError>;
