//! Scripted in-memory transport for tests

use super::{CatalogChannel, CatalogTransport, EmitHandle, TransportError, WriteResponse};
use crate::proposal::Proposal;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake does with the n-th submission
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed { delay: Duration },
    /// Never resolves
    Hang,
    /// `submit` itself fails
    FailSubmit,
    Reject { status: u16 },
}

impl Behaviour {
    pub fn ok() -> Self {
        Behaviour::Succeed {
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeStats {
    pub opens: AtomicUsize,
    pub submissions: AtomicUsize,
    pub closes: AtomicUsize,
    submitted: Mutex<Vec<Arc<Proposal>>>,
}

impl FakeStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Arc<Proposal>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct FakeTransport {
    script: Arc<Vec<Behaviour>>,
    fail_open: bool,
    pub stats: Arc<FakeStats>,
}

impl FakeTransport {
    /// Every submission succeeds immediately
    pub fn succeeding() -> Self {
        Self::scripted(Vec::new())
    }

    /// Submission `i` follows `script[i]`; submissions past the end succeed
    pub fn scripted(script: Vec<Behaviour>) -> Self {
        Self {
            script: Arc::new(script),
            fail_open: false,
            stats: Arc::new(FakeStats::default()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::succeeding()
        }
    }
}

#[async_trait]
impl CatalogTransport for FakeTransport {
    fn endpoint(&self) -> &str {
        "fake://catalog"
    }

    async fn open(&self) -> Result<Box<dyn CatalogChannel>, TransportError> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(TransportError::ChannelUnavailable("connection refused".to_string()));
        }
        Ok(Box::new(FakeChannel {
            script: self.script.clone(),
            stats: self.stats.clone(),
        }))
    }
}

struct FakeChannel {
    script: Arc<Vec<Behaviour>>,
    stats: Arc<FakeStats>,
}

impl CatalogChannel for FakeChannel {
    fn submit(&self, proposal: Arc<Proposal>) -> Result<EmitHandle, TransportError> {
        let index = self.stats.submissions.fetch_add(1, Ordering::SeqCst);
        self.stats.submitted.lock().unwrap().push(proposal);

        match self.script.get(index).cloned().unwrap_or_else(Behaviour::ok) {
            Behaviour::Succeed { delay } => Ok(EmitHandle::spawn(async move {
                tokio::time::sleep(delay).await;
                Ok(WriteResponse {
                    status: 200,
                    body: String::new(),
                })
            })),
            Behaviour::Hang => Ok(EmitHandle::spawn(std::future::pending())),
            Behaviour::FailSubmit => Err(TransportError::Submission("socket closed".to_string())),
            Behaviour::Reject { status } => Ok(EmitHandle::spawn(async move {
                Err(TransportError::Rejected {
                    status,
                    body: "rejected".to_string(),
                })
            })),
        }
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
