use thiserror::Error;

use crate::queue::JobId;

/// Failure of a whole `process` call or job request. Per-citation misses and
/// unverified clusters are results, never errors.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("document is empty")]
    EmptyDocument,
    #[error("document is not text: {0}")]
    NotText(String),
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("job {0} was cancelled")]
    Cancelled(JobId),
    #[error("job failed: {0}")]
    Failed(String),
    #[error("job worker panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("verification sources unavailable: {0}")]
    Source(#[from] citecheck_verify::SourceError),
}
