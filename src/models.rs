//! Data models and DTOs (Data Transfer Objects)
//!
//! Request and response bodies of the trigger API.

use crate::sync::{FailurePolicy, OutcomeStatus, RunScope, SyncRunResult, TableSyncReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Request to patch dataset properties
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertiesRequest {
    /// Display name asserted alongside the properties
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_property_keys"))]
    pub properties: BTreeMap<String, String>,
}

fn validate_property_keys(properties: &BTreeMap<String, String>) -> Result<(), validator::ValidationError> {
    if properties.keys().any(|k| k.trim().is_empty()) {
        let mut err = validator::ValidationError::new("blank_property_key");
        err.message = Some("Property keys must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// One failed proposal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    pub entity_urn: String,
    pub aspect: String,
    pub status: &'static str,
    pub error: String,
}

/// Outcome of one orchestration call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub operation: String,
    pub policy: FailurePolicy,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl From<&SyncRunResult> for RunSummary {
    fn from(result: &SyncRunResult) -> Self {
        let failures = result
            .failed_outcomes
            .iter()
            .map(|outcome| FailureSummary {
                entity_urn: outcome.proposal.entity_urn().to_string(),
                aspect: outcome.proposal.aspect_name().to_string(),
                status: match outcome.status {
                    OutcomeStatus::Succeeded => "succeeded",
                    OutcomeStatus::TimedOut => "timed_out",
                    OutcomeStatus::Failed(_) => "failed",
                },
                error: outcome.error().map(|e| error_chain(&e)).unwrap_or_default(),
            })
            .collect();

        Self {
            run_id: result.run_id,
            operation: result.operation.clone(),
            policy: result.policy,
            total: result.total(),
            succeeded: result.succeeded_count,
            failed: result.failed_outcomes.len(),
            failures,
            started_at: result.started_at,
            finished_at: result.finished_at,
        }
    }
}

// "outer: inner: root" rendering of an error and its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Response of a full table sync
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSyncResponse {
    pub scope: RunScope,
    pub schema: RunSummary,
    pub properties: RunSummary,
    pub last_commit: Option<RunSummary>,
    pub last_commit_time: Option<String>,
}

impl TableSyncResponse {
    pub fn new(scope: RunScope, report: &TableSyncReport) -> Self {
        Self {
            scope,
            schema: RunSummary::from(&report.schema),
            properties: RunSummary::from(&report.properties),
            last_commit: report.last_commit.as_ref().map(RunSummary::from),
            last_commit_time: report.last_commit_time.clone(),
        }
    }
}

/// Response of a single-step sync
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub scope: RunScope,
    pub run: RunSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertiesResponse {
    pub dataset_urn: String,
    pub updated: bool,
}
