//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service, and the mapping from
//! dashboard failures to HTTP responses.

use axum::http::StatusCode;
use dashboard_core::{DashboardError, PortError};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Converts an operation failure into the status and message sent to the client.
pub fn to_response(err: DashboardError) -> (StatusCode, String) {
    let status = match &err {
        DashboardError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DashboardError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::RemoteOperationFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, err.user_message())
}
