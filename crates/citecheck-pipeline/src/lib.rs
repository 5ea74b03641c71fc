//! The orchestrator: `process(document_text)` runs extraction, clustering
//! and verification and returns every citation and cluster.
//!
//! Documents under `pipeline.sync_threshold_bytes` run inline. Larger ones
//! are submitted to a [`JobQueue`] and report [`ProgressEvent`]s as each
//! engine completes. Both paths run the same [`Pipeline`], so the mode never
//! changes the result.

pub mod error;
pub mod eval;
pub mod orchestrator;
pub mod progress;
pub mod queue;

pub use error::ProcessError;
pub use orchestrator::{Orchestrator, Pipeline, Submission, check_document};
pub use progress::{ProgressEvent, Stage};
pub use queue::{JobId, JobQueue, JobStatus, TokioJobQueue};
