//! Catalog transport
//!
//! The capability the emission executor drives: open a channel, submit
//! proposals through it, then close it. Every submission runs as its own
//! task and hands back an [`EmitHandle`] that is already in flight.

pub mod rest;

#[cfg(test)]
pub mod fake;

pub use rest::RestEmitter;

use crate::proposal::Proposal;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// What the catalog answered for one accepted proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResponse {
    pub status: u16,
    pub body: String,
}

/// Why a single proposal could not be delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Catalog channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Catalog rejected proposal with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Emission task aborted: {0}")]
    Aborted(String),
}

/// An in-flight emission
#[derive(Debug)]
pub struct EmitHandle {
    inner: JoinHandle<Result<WriteResponse, TransportError>>,
}

impl EmitHandle {
    /// Start `emission` on the runtime right away
    pub fn spawn<F>(emission: F) -> Self
    where
        F: Future<Output = Result<WriteResponse, TransportError>> + Send + 'static,
    {
        Self {
            inner: tokio::spawn(emission),
        }
    }

    /// Wait at most `timeout` for the result. `None` means the wait timed
    /// out; the emission is aborted in that case.
    pub async fn wait(mut self, timeout: Duration) -> Option<Result<WriteResponse, TransportError>> {
        match tokio::time::timeout(timeout, &mut self.inner).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(join_err)) => Some(Err(TransportError::Aborted(join_err.to_string()))),
            Err(_) => {
                self.inner.abort();
                None
            }
        }
    }
}

/// Factory for catalog channels
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Where proposals end up, for logging
    fn endpoint(&self) -> &str;

    async fn open(&self) -> Result<Box<dyn CatalogChannel>, TransportError>;
}

/// One open connection to the catalog, shared by all in-flight submissions
/// of a batch
pub trait CatalogChannel: Send + Sync {
    /// Start emitting `proposal`. An error here means nothing was sent.
    fn submit(&self, proposal: Arc<Proposal>) -> Result<EmitHandle, TransportError>;

    /// Release the channel
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}
