//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler and connection.

use crate::config::Config;
use dashboard_core::ports::DatabaseService;
use dashboard_core::service::Dashboard;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Used directly only for authentication; all owned data goes through `dashboard`.
    pub db: Arc<dyn DatabaseService>,
    pub dashboard: Arc<Dashboard>,
    pub config: Arc<Config>,
}
