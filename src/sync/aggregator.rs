//! Outcome aggregation
//!
//! Folds per-proposal outcomes into one run result and applies the failure
//! policy once the whole batch is known.

use super::outcome::{FailurePolicy, Outcome, RunHeader, SyncFailure, SyncRunResult};
use chrono::Utc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeAggregator;

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        run: RunHeader,
        outcomes: Vec<Outcome>,
        policy: FailurePolicy,
    ) -> Result<SyncRunResult, SyncFailure> {
        let total = outcomes.len();
        let (succeeded, failed): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(Outcome::is_success);

        let result = SyncRunResult {
            run_id: run.run_id,
            operation: run.operation,
            policy,
            succeeded_count: succeeded.len(),
            failed_outcomes: failed,
            started_at: run.started_at,
            finished_at: Utc::now(),
        };

        let Some(first) = result.failed_outcomes.iter().find_map(Outcome::error) else {
            info!(
                run_id = %result.run_id,
                "✅ {} synced {} proposals",
                result.operation,
                total
            );
            return Ok(result);
        };

        match policy {
            FailurePolicy::SuppressErrors => {
                for outcome in &result.failed_outcomes {
                    if let Some(err) = outcome.error() {
                        error!(
                            run_id = %result.run_id,
                            operation = %result.operation,
                            "Failed to sync operation: {}: {:?}",
                            err,
                            outcome.status
                        );
                    }
                }
                Ok(result)
            }
            FailurePolicy::PropagateFirstError => Err(SyncFailure {
                operation: result.operation,
                failures: result.failed_outcomes.len(),
                total,
                first,
            }),
        }
    }
}
