//! Sync orchestrator
//!
//! Composes builders, executor and aggregator into the operations callers
//! see. Every call is a single pass: read facts, build, emit, aggregate.

use super::aggregator::OutcomeAggregator;
use super::executor::EmissionExecutor;
use super::outcome::{RunHeader, SyncRunResult};
use super::{PropertyUpdater, SchemaUpdater};
use crate::config::SyncConfig;
use crate::emitter::CatalogTransport;
use crate::error::SyncError;
use crate::identifier::DatasetIdentifier;
use crate::proposal::{Proposal, ProposalBuilder};
use crate::schema::{SchemaDifference, TableSchema};
use crate::table::{derive_table_properties, TableMetadata, LAST_COMMIT_TIME_SYNC};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Results of a full table sync
#[derive(Debug, Clone)]
pub struct TableSyncReport {
    pub schema: SyncRunResult,
    pub properties: SyncRunResult,
    /// `None` when the table has no completed commit yet
    pub last_commit: Option<SyncRunResult>,
    pub last_commit_time: Option<String>,
}

impl TableSyncReport {
    pub fn is_success(&self) -> bool {
        self.schema.is_success()
            && self.properties.is_success()
            && self.last_commit.as_ref().map_or(true, SyncRunResult::is_success)
    }
}

/// Short description of what a run touched, for logs and responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScope {
    pub dataset_urn: String,
    pub container_urn: String,
    pub endpoint: String,
}

/// Publishes one table's metadata to the catalog
pub struct CatalogSyncClient {
    config: SyncConfig,
    builder: ProposalBuilder,
    transport: Arc<dyn CatalogTransport>,
    metadata: Arc<dyn TableMetadata>,
    executor: EmissionExecutor,
    aggregator: OutcomeAggregator,
}

impl CatalogSyncClient {
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn CatalogTransport>,
        metadata: Arc<dyn TableMetadata>,
    ) -> Result<Self, SyncError> {
        let identifier = DatasetIdentifier::from_config(&config)?;
        let builder = ProposalBuilder::from_config(&config, identifier);

        Ok(Self {
            config,
            builder,
            transport,
            metadata,
            executor: EmissionExecutor::new(),
            aggregator: OutcomeAggregator::new(),
        })
    }

    pub fn identifier(&self) -> &DatasetIdentifier {
        self.builder.identifier()
    }

    pub fn scope(&self) -> RunScope {
        RunScope {
            dataset_urn: self.identifier().dataset_urn.to_string(),
            container_urn: self.identifier().container_urn.to_string(),
            endpoint: self.transport.endpoint().to_string(),
        }
    }

    async fn run(&self, operation: &str, proposals: Vec<Proposal>) -> Result<SyncRunResult, SyncError> {
        let run = RunHeader::start(operation);
        info!(
            run_id = %run.run_id,
            "Emitting {} proposals for {} to {}",
            proposals.len(),
            operation,
            self.transport.endpoint()
        );

        let outcomes = self
            .executor
            .emit(self.transport.as_ref(), proposals, self.config.emit_timeout())
            .await;

        Ok(self
            .aggregator
            .aggregate(run, outcomes, self.config.failure_policy())?)
    }

    async fn patch_properties(
        &self,
        operation: &str,
        table_name: Option<&str>,
        properties: BTreeMap<String, String>,
    ) -> Result<SyncRunResult, SyncError> {
        let proposal = self.builder.properties_patch(table_name, properties);
        self.run(operation, vec![proposal]).await
    }

    async fn publish_schema(
        &self,
        table_name: &str,
        schema: &TableSchema,
        difference: Option<&SchemaDifference>,
    ) -> Result<SyncRunResult, SyncError> {
        if let Some(diff) = difference {
            info!(
                "Schema of {} changed: {} added, {} updated, {} deleted",
                table_name,
                diff.added.len(),
                diff.updated.len(),
                diff.deleted.len()
            );
        }
        // The catalog always receives the full schema
        let proposals = self.builder.schema_sync_proposals(schema);
        self.run("update_table_schema", proposals).await
    }

    /// Publish the table schema read from the table
    pub async fn sync_schema(&self) -> Result<SyncRunResult, SyncError> {
        let facts = self.metadata.facts().await?;
        self.publish_schema(&self.identifier().table_name, &facts.schema, None)
            .await
    }

    /// Publish the derived table properties
    pub async fn sync_table_properties(&self) -> Result<SyncRunResult, SyncError> {
        let facts = self.metadata.facts().await?;
        let properties = derive_table_properties(&self.config, &facts)?;
        self.patch_properties(
            "update_table_properties",
            Some(self.identifier().table_name.as_str()),
            properties,
        )
        .await
    }

    /// Record the latest completed commit on the dataset. Returns `None`
    /// without emitting when the table has no completed commit.
    pub async fn update_last_commit_time_synced(&self) -> Result<Option<SyncRunResult>, SyncError> {
        let Some(instant) = self.metadata.last_commit_time().await? else {
            warn!("No completed commit on {}, skipping", self.identifier().qualified_name());
            return Ok(None);
        };

        let mut properties = BTreeMap::new();
        properties.insert(LAST_COMMIT_TIME_SYNC.to_string(), instant);
        self.patch_properties(
            "update_last_commit_time_synced",
            Some(self.identifier().table_name.as_str()),
            properties,
        )
        .await
        .map(Some)
    }

    /// Schema, then properties, then the last commit marker
    pub async fn sync_table(&self) -> Result<TableSyncReport, SyncError> {
        let table_name = self.identifier().table_name.clone();
        info!("🔄 Syncing {} to {}", self.identifier().qualified_name(), self.transport.endpoint());

        let facts = self.metadata.facts().await?;
        let properties = derive_table_properties(&self.config, &facts)?;

        let schema = self.publish_schema(&table_name, &facts.schema, None).await?;
        let properties = self
            .patch_properties("update_table_properties", Some(table_name.as_str()), properties)
            .await?;

        let last_commit_time = self.metadata.last_commit_time().await?;
        let last_commit = match &last_commit_time {
            Some(instant) => {
                let mut marker = BTreeMap::new();
                marker.insert(LAST_COMMIT_TIME_SYNC.to_string(), instant.clone());
                Some(
                    self.patch_properties("update_last_commit_time_synced", Some(table_name.as_str()), marker)
                        .await?,
                )
            }
            None => None,
        };

        Ok(TableSyncReport {
            schema,
            properties,
            last_commit,
            last_commit_time,
        })
    }
}

#[async_trait]
impl PropertyUpdater for CatalogSyncClient {
    async fn update_table_properties(
        &self,
        table_name: Option<&str>,
        properties: BTreeMap<String, String>,
    ) -> Result<bool, SyncError> {
        let result = self
            .patch_properties("update_table_properties", table_name, properties)
            .await?;
        Ok(result.is_success())
    }
}

#[async_trait]
impl SchemaUpdater for CatalogSyncClient {
    async fn update_table_schema(
        &self,
        table_name: &str,
        schema: &TableSchema,
        difference: Option<&SchemaDifference>,
    ) -> Result<SyncRunResult, SyncError> {
        self.publish_schema(table_name, schema, difference).await
    }
}
