//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::sync::CatalogSyncClient;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Sync client bound to the configured table and catalog
    pub sync: CatalogSyncClient,
}

impl AppState {
    pub fn new(sync: CatalogSyncClient) -> Self {
        Self { sync }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
