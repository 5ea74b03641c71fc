//! In-memory sources for tests. Never touch the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::query::{Candidate, ClusterQuery};
use crate::source::Verifier;

/// A source with a fixed answer, counting how often it is asked.
pub struct StaticVerifier {
    name: String,
    weight: f32,
    candidates: Vec<Candidate>,
    fail_status: Option<u16>,
    /// Number of leading calls that fail with `fail_status`; `None` fails every call.
    fail_times: Option<usize>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticVerifier {
    pub fn returning(name: &str, candidates: Vec<Candidate>) -> Self {
        Self {
            name: name.to_string(),
            weight: 0.9,
            candidates,
            fail_status: None,
            fail_times: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call answers with an HTTP error status.
    pub fn failing(name: &str, status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::returning(name, Vec::new())
        }
    }

    /// The first call fails with `status`, later calls return `candidates`.
    pub fn failing_once(name: &str, status: u16, candidates: Vec<Candidate>) -> Self {
        Self {
            fail_status: Some(status),
            fail_times: Some(1),
            ..Self::returning(name, candidates)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Verifier for StaticVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    async fn lookup(&self, _query: &ClusterQuery) -> Result<Vec<Candidate>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(status) = self.fail_status
            && self.fail_times.is_none_or(|n| call < n)
        {
            return Err(SourceError::Server {
                status,
                body: "fake failure".into(),
            });
        }
        Ok(self.candidates.clone())
    }
}
