//! Metadata synchronization engine
//!
//! Proposals are emitted concurrently, every outcome is collected, and the
//! failure policy decides whether partial failure is logged or raised.

pub mod aggregator;
pub mod executor;
pub mod orchestrator;
pub mod outcome;

pub use executor::{EmissionExecutor, DEFAULT_EMIT_TIMEOUT};
pub use orchestrator::{CatalogSyncClient, RunScope, TableSyncReport};
pub use outcome::{
    FailurePolicy, Outcome, OutcomeError, OutcomeStatus, RunHeader, SyncFailure, SyncRunResult,
};

use crate::error::SyncError;
use crate::schema::{SchemaDifference, TableSchema};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Patches dataset properties in the catalog
#[async_trait]
pub trait PropertyUpdater: Send + Sync {
    /// `Ok(false)` when the patch failed and failures are suppressed
    async fn update_table_properties(
        &self,
        table_name: Option<&str>,
        properties: BTreeMap<String, String>,
    ) -> Result<bool, SyncError>;
}

/// Publishes a table schema to the catalog
#[async_trait]
pub trait SchemaUpdater: Send + Sync {
    async fn update_table_schema(
        &self,
        table_name: &str,
        schema: &TableSchema,
        difference: Option<&SchemaDifference>,
    ) -> Result<SyncRunResult, SyncError>;
}
