//! Emission executor
//!
//! Fans a batch of proposals out over one catalog channel. Each proposal is
//! awaited with its own deadline, so a slow or hung proposal only costs its
//! own slot. Outcomes come back in completion order.

use super::outcome::{Outcome, OutcomeStatus};
use crate::emitter::{CatalogChannel, CatalogTransport, EmitHandle, TransportError};
use crate::proposal::Proposal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default wait for one proposal
pub const DEFAULT_EMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Open channel that is closed exactly once, on drop if not before
struct OpenChannel<'a> {
    channel: Option<Box<dyn CatalogChannel>>,
    endpoint: &'a str,
}

impl<'a> OpenChannel<'a> {
    fn new(channel: Box<dyn CatalogChannel>, endpoint: &'a str) -> Self {
        Self {
            channel: Some(channel),
            endpoint,
        }
    }

    fn submit(&self, proposal: Arc<Proposal>) -> Result<EmitHandle, TransportError> {
        match &self.channel {
            Some(channel) => channel.submit(proposal),
            None => Err(TransportError::ChannelUnavailable("channel already closed".to_string())),
        }
    }

    fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close() {
                warn!("Failed to close channel to {}: {}", self.endpoint, e);
            }
        }
    }
}

impl Drop for OpenChannel<'_> {
    fn drop(&mut self) {
        if self.channel.is_some() {
            debug!("Emission to {} abandoned, closing channel", self.endpoint);
            self.release();
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionExecutor;

impl EmissionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Emit every proposal and return exactly one outcome per proposal
    pub async fn emit(
        &self,
        transport: &dyn CatalogTransport,
        proposals: Vec<Proposal>,
        per_call_timeout: Duration,
    ) -> Vec<Outcome> {
        let proposals: Vec<Arc<Proposal>> = proposals.into_iter().map(Arc::new).collect();

        let channel = match transport.open().await {
            Ok(channel) => OpenChannel::new(channel, transport.endpoint()),
            Err(e) => {
                warn!("Could not open channel to {}: {}", transport.endpoint(), e);
                let cause = match e {
                    TransportError::ChannelUnavailable(_) => e,
                    other => TransportError::ChannelUnavailable(other.to_string()),
                };
                return proposals
                    .into_iter()
                    .map(|proposal| Outcome {
                        proposal,
                        status: OutcomeStatus::Failed(cause.clone()),
                        elapsed: Duration::ZERO,
                    })
                    .collect();
            }
        };

        let mut outcomes = Vec::with_capacity(proposals.len());
        let mut resolved = vec![false; proposals.len()];
        let mut waiters = JoinSet::new();

        for (index, proposal) in proposals.iter().enumerate() {
            let submitted_at = Instant::now();
            match channel.submit(proposal.clone()) {
                Ok(handle) => {
                    let proposal = proposal.clone();
                    waiters.spawn(async move {
                        let status = match handle.wait(per_call_timeout).await {
                            Some(Ok(_)) => OutcomeStatus::Succeeded,
                            Some(Err(e)) => OutcomeStatus::Failed(e),
                            None => OutcomeStatus::TimedOut,
                        };
                        let outcome = Outcome {
                            proposal,
                            status,
                            elapsed: submitted_at.elapsed(),
                        };
                        (index, outcome)
                    });
                }
                Err(e) => {
                    resolved[index] = true;
                    outcomes.push(Outcome {
                        proposal: proposal.clone(),
                        status: OutcomeStatus::Failed(e),
                        elapsed: submitted_at.elapsed(),
                    });
                }
            }
        }

        while let Some(joined) = waiters.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    resolved[index] = true;
                    debug!("{} resolved after {:?}", outcome.proposal, outcome.elapsed);
                    outcomes.push(outcome);
                }
                Err(e) => warn!("Emission waiter failed: {}", e),
            }
        }

        // A waiter that died took its outcome with it
        for (index, proposal) in proposals.iter().enumerate() {
            if !resolved[index] {
                outcomes.push(Outcome {
                    proposal: proposal.clone(),
                    status: OutcomeStatus::Failed(TransportError::Aborted(
                        "emission waiter did not report".to_string(),
                    )),
                    elapsed: Duration::ZERO,
                });
            }
        }

        channel.close();

        outcomes
    }
}
