//! `process(document_text)`: the three engines in order, inline for small
//! documents and through the job queue for large ones.

use std::sync::Arc;

use citecheck_cluster::{cluster, has_conflicting_identity, propagate_canonical};
use citecheck_core::{ClusterConfig, Config, PipelineConfig, ProcessResult};
use citecheck_extract::Extractor;
use citecheck_verify::VerificationMaster;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::progress::{ProgressEvent, Stage};
use crate::queue::{JobId, JobQueue, TokioJobQueue};

/// Share of control characters above which input is treated as binary.
const MAX_CONTROL_RATIO: f64 = 0.01;

// ── Engines ──

/// Extraction, clustering and verification wired together. The same
/// instance runs inline calls and queued jobs.
pub struct Pipeline {
    extractor: Extractor,
    cluster: ClusterConfig,
    master: Arc<VerificationMaster>,
}

impl Pipeline {
    pub fn new(extractor: Extractor, cluster: ClusterConfig, master: Arc<VerificationMaster>) -> Self {
        Self {
            extractor,
            cluster,
            master,
        }
    }

    /// Production verification sources from `config.verify`.
    pub fn from_config(config: &Config) -> Result<Self, ProcessError> {
        let master = VerificationMaster::from_config(&config.verify)?;
        Ok(Self::new(
            Extractor::new(config.extract.clone()),
            config.cluster.clone(),
            Arc::new(master),
        ))
    }

    /// No verification sources; every cluster ends unverified.
    pub fn offline(config: &Config) -> Self {
        Self::new(
            Extractor::new(config.extract.clone()),
            config.cluster.clone(),
            Arc::new(VerificationMaster::offline(config.verify.clone())),
        )
    }

    pub fn master(&self) -> &VerificationMaster {
        &self.master
    }

    /// Extraction and clustering only, no network.
    pub fn extract_and_cluster(&self, text: &str) -> ProcessResult {
        let mut citations = self.extractor.extract(text);
        let clusters = cluster(&mut citations, &self.cluster);
        ProcessResult::new(citations, clusters)
    }

    /// Every stage in order. Each stage finishes before the next starts.
    /// `cancel` is checked between cluster verifications; clusters not yet
    /// started when it trips are left unverified with reason "cancelled".
    pub async fn run<F>(&self, text: &str, cancel: &CancellationToken, mut progress: F) -> ProcessResult
    where
        F: FnMut(ProgressEvent),
    {
        progress(ProgressEvent::start(Stage::Extract, "recognizing citations"));
        let mut citations = self.extractor.recognize(text);

        progress(ProgressEvent::start(
            Stage::Analyze,
            format!("{} citations found", citations.len()),
        ));
        self.extractor.analyze(text, &mut citations);

        progress(ProgressEvent::start(Stage::ExtractNames, "reading case names"));
        self.extractor.attach_names(text, &mut citations);

        let mut clusters = cluster(&mut citations, &self.cluster);
        progress(ProgressEvent::start(
            Stage::Verify,
            format!("verifying {} clusters", clusters.len()),
        ));
        self.master
            .verify_all(&citations, &mut clusters, cancel, |done, total| {
                progress(ProgressEvent::new(
                    Stage::Verify,
                    Stage::Verify.percent(done, total),
                    format!("verified {done} of {total} clusters"),
                ));
            })
            .await;

        progress(ProgressEvent::start(Stage::Cluster, "applying canonical identities"));
        let applied = propagate_canonical(&mut citations, &clusters);
        for c in clusters.iter().filter(|c| has_conflicting_identity(&citations, c)) {
            warn!(cluster = c.id.0, "cluster members disagree on canonical name");
        }

        let result = ProcessResult::new(citations, clusters);
        info!(
            citations = result.citations.len(),
            clusters = result.clusters.len(),
            verified = result.verified_count(),
            applied,
            "document processed"
        );
        progress(ProgressEvent::new(Stage::Cluster, 100, "done"));
        result
    }
}

// ── Orchestrator ──

/// What [`Orchestrator::process`] hands back.
#[derive(Debug)]
pub enum Submission {
    /// Small document, processed inline.
    Completed(ProcessResult),
    /// Large document, running as a background job.
    Queued(JobId),
}

pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    queue: Arc<dyn JobQueue>,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Uses the in-process [`TokioJobQueue`]. Must be called inside a tokio runtime.
    pub fn new(pipeline: Arc<Pipeline>, config: PipelineConfig) -> Self {
        let queue = Arc::new(TokioJobQueue::new(Arc::clone(&pipeline), config.max_concurrent_jobs));
        Self::with_queue(pipeline, queue, config)
    }

    /// Substitute an external queue/worker system.
    pub fn with_queue(pipeline: Arc<Pipeline>, queue: Arc<dyn JobQueue>, config: PipelineConfig) -> Self {
        Self {
            pipeline,
            queue,
            config,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn queue(&self) -> &dyn JobQueue {
        self.queue.as_ref()
    }

    /// Whether `text` would be processed inline.
    pub fn is_sync(&self, text: &str) -> bool {
        text.len() < self.config.sync_threshold_bytes
    }

    /// Validate the document, then process it inline or submit it as a job.
    pub async fn process(&self, text: &str) -> Result<Submission, ProcessError> {
        self.process_with_progress(text, |event| {
            debug!(stage = %event.stage, percent = event.percent, message = %event.message, "progress");
        })
        .await
    }

    /// As [`process`](Self::process); `progress` sees the inline run's
    /// events. Queued jobs report through [`JobQueue::subscribe`].
    pub async fn process_with_progress<F>(&self, text: &str, progress: F) -> Result<Submission, ProcessError>
    where
        F: FnMut(ProgressEvent),
    {
        check_document(text)?;
        if self.is_sync(text) {
            debug!(bytes = text.len(), "processing inline");
            let result = self.pipeline.run(text, &CancellationToken::new(), progress).await;
            return Ok(Submission::Completed(result));
        }
        let id = self.queue.submit(text.to_string()).await?;
        info!(job = %id, bytes = text.len(), "document queued");
        Ok(Submission::Queued(id))
    }

    /// Raw bytes from an ingestion collaborator; must be UTF-8 text.
    pub async fn process_bytes(&self, bytes: &[u8]) -> Result<Submission, ProcessError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ProcessError::NotText(format!("invalid UTF-8 at byte {}", e.valid_up_to())))?;
        self.process(text).await
    }

    /// Process and wait for the result whichever mode runs it.
    pub async fn process_to_completion(&self, text: &str) -> Result<ProcessResult, ProcessError> {
        match self.process(text).await? {
            Submission::Completed(result) => Ok(result),
            Submission::Queued(id) => self.queue.wait(id).await,
        }
    }
}

/// Reject input no engine should see: empty, whitespace-only or binary.
pub fn check_document(text: &str) -> Result<(), ProcessError> {
    if text.trim().is_empty() {
        return Err(ProcessError::EmptyDocument);
    }
    if text.contains('\0') {
        return Err(ProcessError::NotText("contains NUL bytes".into()));
    }
    let total = text.chars().count();
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{c}'))
        .count();
    if control as f64 / total as f64 > MAX_CONTROL_RATIO {
        return Err(ProcessError::NotText(format!(
            "{control} control characters in {total}"
        )));
    }
    Ok(())
}
