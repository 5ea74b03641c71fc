//! Background jobs for documents too large to process inline.
//!
//! [`JobQueue`] is the "run later, notify me" seam; [`TokioJobQueue`] is the
//! in-process default. Each job gets a cancellation token checked between
//! cluster verifications, a status watch, and a progress broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use citecheck_core::ProcessResult;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ProcessError;
use crate::orchestrator::Pipeline;
use crate::progress::{ProgressEvent, Stage};

/// Buffered progress events per job; slow subscribers see `Lagged`.
const PROGRESS_CAPACITY: usize = 64;

/// Finished jobs kept for `status` and `wait` before `submit` drops the oldest.
const RETAINED_FINISHED: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Running { stage: Stage, percent: u8 },
    Completed(Arc<ProcessResult>),
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_) | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running { .. } => "running",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, text: String) -> Result<JobId, ProcessError>;

    async fn status(&self, id: JobId) -> Result<JobStatus, ProcessError>;

    /// Ask the job to stop. Clusters already verifying finish; the rest are skipped.
    async fn cancel(&self, id: JobId) -> Result<(), ProcessError>;

    /// Progress events emitted from now on.
    async fn subscribe(&self, id: JobId) -> Result<broadcast::Receiver<ProgressEvent>, ProcessError>;

    /// Wait for the job to reach a terminal state.
    async fn wait(&self, id: JobId) -> Result<ProcessResult, ProcessError>;
}

struct JobEntry {
    /// Submission order.
    seq: u64,
    status: Arc<watch::Sender<JobStatus>>,
    progress: broadcast::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

/// Jobs run as tokio tasks, at most `max_concurrent` at a time. Each
/// `submit` drops finished jobs beyond the newest `retained_finished`, so the
/// table stays bounded in a long-running process.
pub struct TokioJobQueue {
    pipeline: Arc<Pipeline>,
    jobs: Arc<RwLock<HashMap<JobId, JobEntry>>>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    next_seq: AtomicU64,
    retained_finished: usize,
}

impl TokioJobQueue {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            shutdown: CancellationToken::new(),
            next_seq: AtomicU64::new(0),
            retained_finished: RETAINED_FINISHED,
        }
    }

    /// Keep at most `n` finished jobs queryable.
    pub fn with_retained_finished(mut self, n: usize) -> Self {
        self.retained_finished = n;
        self
    }

    /// Cancel every job, queued or running.
    pub fn shutdown(&self) {
        info!("cancelling all jobs");
        self.shutdown.cancel();
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every finished job from the table. `submit` already bounds it;
    /// this frees the rest early.
    pub async fn prune(&self) -> usize {
        drop_finished(&mut *self.jobs.write().await, 0)
    }

    async fn entry<T>(&self, id: JobId, f: impl FnOnce(&JobEntry) -> T) -> Result<T, ProcessError> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).map(f).ok_or(ProcessError::UnknownJob(id))
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    async fn submit(&self, text: String) -> Result<JobId, ProcessError> {
        let id = JobId::new();
        let (status_tx, _) = watch::channel(JobStatus::Queued);
        let status = Arc::new(status_tx);
        let (progress, _) = broadcast::channel(PROGRESS_CAPACITY);
        let cancel = self.shutdown.child_token();

        {
            let mut jobs = self.jobs.write().await;
            let dropped = drop_finished(&mut jobs, self.retained_finished);
            if dropped > 0 {
                debug!(dropped, "dropped finished jobs");
            }
            jobs.insert(
                id,
                JobEntry {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    status: Arc::clone(&status),
                    progress: progress.clone(),
                    cancel: cancel.clone(),
                },
            );
        }

        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(job = %id, error = %e, "job queue closed");
                        status.send_replace(JobStatus::Failed(e.to_string()));
                        return;
                    }
                },
                _ = cancel.cancelled() => {
                    info!(job = %id, "cancelled before start");
                    status.send_replace(JobStatus::Cancelled);
                    return;
                }
            };

            info!(job = %id, bytes = text.len(), "job started");
            status.send_replace(JobStatus::Running {
                stage: Stage::Extract,
                percent: 0,
            });

            // The pipeline runs in its own task so a panic fails this job only.
            let worker = {
                let status = Arc::clone(&status);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    pipeline
                        .run(&text, &cancel, |event| {
                            status.send_replace(JobStatus::Running {
                                stage: event.stage,
                                percent: event.percent,
                            });
                            // No subscribers is fine.
                            let _ = progress.send(event);
                        })
                        .await
                })
            };

            let finished = match worker.await.map_err(ProcessError::from) {
                Ok(_) if cancel.is_cancelled() => {
                    info!(job = %id, "job cancelled");
                    JobStatus::Cancelled
                }
                Ok(result) => {
                    info!(job = %id, verified = result.verified_count(), "job completed");
                    JobStatus::Completed(Arc::new(result))
                }
                Err(e) => {
                    error!(job = %id, error = %e, "job failed");
                    JobStatus::Failed(e.to_string())
                }
            };
            status.send_replace(finished);
        });

        debug!(job = %id, "job submitted");
        Ok(id)
    }

    async fn status(&self, id: JobId) -> Result<JobStatus, ProcessError> {
        self.entry(id, |e| e.status.borrow().clone()).await
    }

    async fn cancel(&self, id: JobId) -> Result<(), ProcessError> {
        let cancel = self.entry(id, |e| e.cancel.clone()).await?;
        warn!(job = %id, "cancelling job");
        cancel.cancel();
        Ok(())
    }

    async fn subscribe(&self, id: JobId) -> Result<broadcast::Receiver<ProgressEvent>, ProcessError> {
        self.entry(id, |e| e.progress.subscribe()).await
    }

    async fn wait(&self, id: JobId) -> Result<ProcessResult, ProcessError> {
        let mut rx = self.entry(id, |e| e.status.subscribe()).await?;
        let status = rx
            .wait_for(JobStatus::is_terminal)
            .await
            .map_err(|_| ProcessError::Failed("job worker stopped".into()))?
            .clone();
        match status {
            JobStatus::Completed(result) => Ok(result.as_ref().clone()),
            JobStatus::Cancelled => Err(ProcessError::Cancelled(id)),
            JobStatus::Failed(message) => Err(ProcessError::Failed(message)),
            JobStatus::Queued | JobStatus::Running { .. } => {
                Err(ProcessError::Failed(format!("job {id} ended in state {}", status.as_str())))
            }
        }
    }
}

/// Remove finished jobs, oldest first, until at most `keep` remain.
fn drop_finished(jobs: &mut HashMap<JobId, JobEntry>, keep: usize) -> usize {
    let mut finished: Vec<(u64, JobId)> = jobs
        .iter()
        .filter(|(_, entry)| entry.status.borrow().is_terminal())
        .map(|(id, entry)| (entry.seq, *id))
        .collect();
    if finished.len() <= keep {
        return 0;
    }
    finished.sort_unstable();
    let excess = finished.len() - keep;
    for (_, id) in &finished[..excess] {
        jobs.remove(id);
    }
    excess
}
