//! crates/dashboard_core/src/error.rs
//!
//! The error type surfaced by every dashboard operation.

use crate::ports::PortError;

/// A failure scoped to the single user action that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No current user; raised before any data is touched.
    #[error("User not authenticated")]
    Unauthenticated,

    /// The storage backend rejected a read or write.
    #[error("Failed to {action}: {source}")]
    RemoteOperationFailed {
        action: &'static str,
        #[source]
        source: PortError,
    },

    /// Local pre-submit validation failed; the write was never attempted.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DashboardError {
    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Unauthenticated => "User not authenticated".to_string(),
            DashboardError::RemoteOperationFailed { action, .. } => format!("Failed to {}", action),
            DashboardError::ValidationFailed(reason) => reason.clone(),
            DashboardError::NotFound(what) => format!("{} not found", what),
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
