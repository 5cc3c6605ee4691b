//! Sync trigger route handlers
//!
//! Each handler runs one orchestration call against the configured table
//! and reports the aggregated outcome.

use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    RunResponse, RunSummary, SuccessResponse, TableSyncResponse, UpdatePropertiesRequest,
    UpdatePropertiesResponse,
};
use crate::state::SharedState;
use crate::sync::{PropertyUpdater, RunScope};
use axum::{extract::State, Json};
use tracing::{debug, info};
use validator::Validate;

/// Describe the dataset and catalog this server syncs
pub async fn scope(State(state): State<SharedState>) -> Json<SuccessResponse<RunScope>> {
    Json(SuccessResponse::with_data("Sync scope", state.sync.scope()))
}

/// Run schema, properties and last-commit sync in sequence
pub async fn sync_table(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<TableSyncResponse>>> {
    let report = state.sync.sync_table().await?;

    let message = if report.is_success() {
        "Table synced"
    } else {
        "Table synced with failures"
    };
    info!("{} for {}", message, state.sync.identifier().qualified_name());

    Ok(Json(SuccessResponse::with_data(
        message,
        TableSyncResponse::new(state.sync.scope(), &report),
    )))
}

/// Publish the current table schema
pub async fn sync_schema(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<RunResponse>>> {
    let result = state.sync.sync_schema().await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Schema sync finished: {} of {} succeeded", result.succeeded_count, result.total()),
        RunResponse {
            scope: state.sync.scope(),
            run: RunSummary::from(&result),
        },
    )))
}

/// Patch caller-supplied dataset properties
pub async fn update_properties(
    State(state): State<SharedState>,
    Json(payload): Json<UpdatePropertiesRequest>,
) -> ApiResult<Json<SuccessResponse<UpdatePropertiesResponse>>> {
    // Validate input
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    debug!(
        "Patching {} properties on {}",
        payload.properties.len(),
        state.sync.identifier().dataset_urn
    );

    let updated = state
        .sync
        .update_table_properties(payload.name.as_deref(), payload.properties)
        .await?;

    let message = if updated {
        "Properties updated"
    } else {
        "Properties update failed"
    };

    Ok(Json(SuccessResponse::with_data(
        message,
        UpdatePropertiesResponse {
            dataset_urn: state.sync.identifier().dataset_urn.to_string(),
            updated,
        },
    )))
}

/// Record the latest completed commit on the dataset
pub async fn update_last_commit(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Option<RunResponse>>>> {
    let run = state.sync.update_last_commit_time_synced().await?;

    let response = run.as_ref().map(|result| RunResponse {
        scope: state.sync.scope(),
        run: RunSummary::from(result),
    });
    let message = if response.is_some() {
        "Last commit marker synced"
    } else {
        "No completed commit to record"
    };

    Ok(Json(SuccessResponse::with_data(message, response)))
}

/// Reading the marker back from the catalog is not supported
pub async fn last_synced(State(_state): State<SharedState>) -> ApiResult<Json<()>> {
    Err(AppError::NotImplemented(
        "Reading the last synced commit time from the catalog is not supported".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::emitter::fake::{Behaviour, FakeTransport};
    use crate::error::SyncError;
    use crate::schema::{FieldType, SchemaField, TableSchema};
    use crate::state::AppState;
    use crate::sync::CatalogSyncClient;
    use crate::table::{BaseFileFormat, TableFacts, TableMetadata, TableType};
    use async_trait::async_trait;
    use axum::{http::StatusCode, response::IntoResponse};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct FixedTable {
        last_commit: Option<String>,
    }

    #[async_trait]
    impl TableMetadata for FixedTable {
        async fn facts(&self) -> Result<TableFacts, SyncError> {
            Ok(TableFacts {
                table_type: TableType::MergeOnRead,
                table_version: "6".to_string(),
                base_path: "/lake/web/events".to_string(),
                partition_fields: vec!["dt".to_string()],
                base_file_format: BaseFileFormat::Parquet,
                schema: TableSchema {
                    name: "events".to_string(),
                    namespace: None,
                    fields: vec![
                        SchemaField::new("id", FieldType::Long, false),
                        SchemaField::new("dt", FieldType::String, true),
                    ],
                    raw: r#"{"type":"record","name":"events","fields":[]}"#.to_string(),
                },
            })
        }

        async fn last_commit_time(&self) -> Result<Option<String>, SyncError> {
            Ok(self.last_commit.clone())
        }
    }

    fn state(transport: &FakeTransport, suppress: bool, last_commit: Option<&str>) -> SharedState {
        let config = SyncConfig {
            database_name: "web".to_string(),
            table_name: "events".to_string(),
            base_path: "/lake/web/events".to_string(),
            suppress_exceptions: suppress,
            ..SyncConfig::default()
        };
        let table = FixedTable {
            last_commit: last_commit.map(str::to_string),
        };
        let client = CatalogSyncClient::new(config, Arc::new(transport.clone()), Arc::new(table)).unwrap();
        Arc::new(AppState::new(client))
    }

    #[tokio::test]
    async fn test_sync_table_reports_every_step() {
        let transport = FakeTransport::succeeding();
        let Json(response) = sync_table(State(state(&transport, true, Some("20240101120000000"))))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.message, "Table synced");
        let data = response.data.unwrap();
        assert_eq!(data.last_commit_time.as_deref(), Some("20240101120000000"));
        assert!(data.last_commit.is_some());
        assert_eq!(data.schema.failed, 0);
        assert_eq!(transport.stats.opens(), 3);
    }

    #[tokio::test]
    async fn test_update_properties_reports_suppressed_failure() {
        let transport = FakeTransport::scripted(vec![Behaviour::Reject { status: 500 }]);
        let mut properties = BTreeMap::new();
        properties.insert("owner".to_string(), "web-team".to_string());
        let payload = UpdatePropertiesRequest {
            name: None,
            properties,
        };

        let Json(response) = update_properties(State(state(&transport, true, None)), Json(payload))
            .await
            .unwrap();

        let data = response.data.unwrap();
        assert!(!data.updated);
        assert_eq!(response.message, "Properties update failed");
    }

    #[tokio::test]
    async fn test_update_properties_rejects_blank_keys() {
        let transport = FakeTransport::succeeding();
        let mut properties = BTreeMap::new();
        properties.insert("  ".to_string(), "x".to_string());
        let payload = UpdatePropertiesRequest {
            name: None,
            properties,
        };

        let err = update_properties(State(state(&transport, true, None)), Json(payload))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.stats.opens(), 0);
    }

    #[tokio::test]
    async fn test_propagated_failure_is_bad_gateway() {
        let transport = FakeTransport::scripted(vec![Behaviour::Reject { status: 503 }]);

        let err = sync_schema(State(state(&transport, false, None)))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_last_commit_without_commits() {
        let transport = FakeTransport::succeeding();
        let Json(response) = update_last_commit(State(state(&transport, true, None)))
            .await
            .unwrap();

        assert!(response.data.unwrap().is_none());
        assert_eq!(transport.stats.opens(), 0);
    }

    #[tokio::test]
    async fn test_last_synced_is_not_implemented() {
        let transport = FakeTransport::succeeding();
        let err = last_synced(State(state(&transport, true, None))).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_IMPLEMENTED);
    }
}
