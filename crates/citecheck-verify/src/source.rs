use async_trait::async_trait;

use crate::error::SourceError;
use crate::query::{Candidate, ClusterQuery};

/// One external source in the verification chain.
///
/// Sources only fetch and parse. They never decide whether a candidate is
/// the cited case: every candidate goes back to the master, which runs it
/// through the one validation gate.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Stable name used in logs, attempt records and per-source rate limits.
    fn name(&self) -> &str;

    /// Confidence in a validated match from this source, in (0, 1].
    fn weight(&self) -> f32;

    /// Zero or more candidate decisions for the query.
    async fn lookup(&self, query: &ClusterQuery) -> Result<Vec<Candidate>, SourceError>;
}
