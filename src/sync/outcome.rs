//! Outcome types for one sync run

use crate::emitter::TransportError;
use crate::proposal::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// What to do when some proposals of a batch fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log every failure and return normally
    #[default]
    SuppressErrors,
    /// Fail the call with the first failure once the whole batch is known
    PropagateFirstError,
}

impl FailurePolicy {
    pub fn from_suppress_flag(suppress: bool) -> Self {
        if suppress {
            FailurePolicy::SuppressErrors
        } else {
            FailurePolicy::PropagateFirstError
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    TimedOut,
    Failed(TransportError),
}

/// Result of emitting one proposal
#[derive(Debug, Clone)]
pub struct Outcome {
    pub proposal: Arc<Proposal>,
    pub status: OutcomeStatus,
    /// From submission to resolution
    pub elapsed: Duration,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    /// The failure as an error value, `None` on success
    pub fn error(&self) -> Option<OutcomeError> {
        match &self.status {
            OutcomeStatus::Succeeded => None,
            OutcomeStatus::TimedOut => Some(OutcomeError::TimedOut {
                proposal: self.proposal.to_string(),
                elapsed: self.elapsed,
            }),
            OutcomeStatus::Failed(cause) => Some(OutcomeError::Failed {
                proposal: self.proposal.to_string(),
                cause: cause.clone(),
            }),
        }
    }
}

/// A single failed proposal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("Operation timed out: {proposal} after {elapsed:?}")]
    TimedOut { proposal: String, elapsed: Duration },

    #[error("Failed to emit {proposal}")]
    Failed {
        proposal: String,
        #[source]
        cause: TransportError,
    },
}

/// Batch failure surfaced under [`FailurePolicy::PropagateFirstError`]
#[derive(Error, Debug)]
#[error("Failed to sync {failures} operations ({total} attempted) during {operation}")]
pub struct SyncFailure {
    pub operation: String,
    pub failures: usize,
    pub total: usize,
    /// First failure in completion order
    #[source]
    pub first: OutcomeError,
}

/// Identity of one orchestration call, fixed before emission starts
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub run_id: Uuid,
    pub operation: String,
    pub started_at: DateTime<Utc>,
}

impl RunHeader {
    pub fn start(operation: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            operation: operation.into(),
            started_at: Utc::now(),
        }
    }
}

/// Aggregate of one orchestration call
#[derive(Debug, Clone)]
pub struct SyncRunResult {
    pub run_id: Uuid,
    pub operation: String,
    pub policy: FailurePolicy,
    pub succeeded_count: usize,
    /// Non-successful outcomes in completion order
    pub failed_outcomes: Vec<Outcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncRunResult {
    pub fn total(&self) -> usize {
        self.succeeded_count + self.failed_outcomes.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed_outcomes.is_empty()
    }
}
