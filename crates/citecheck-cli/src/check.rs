//! `check`: one document through the orchestrator, following the job when
//! the document is large enough to be queued.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use citecheck_core::{Config, ProcessResult};
use citecheck_pipeline::{Orchestrator, Pipeline, Submission};
use tokio::sync::broadcast::error::RecvError;

pub struct CheckStats {
    pub elapsed_secs: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub async fn run_check(config: &Config, path: &Path, offline: bool) -> anyhow::Result<(ProcessResult, CheckStats)> {
    let start = Instant::now();
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let pipeline = if offline {
        Pipeline::offline(config)
    } else {
        Pipeline::from_config(config).context("building verification sources")?
    };
    let sources = pipeline.master().source_names().join(", ");
    eprintln!(
        "  Read {} bytes from {}; sources: {}",
        bytes.len(),
        path.display(),
        if sources.is_empty() { "none" } else { sources.as_str() }
    );

    let pipeline = Arc::new(pipeline);
    let orchestrator = Orchestrator::new(Arc::clone(&pipeline), config.pipeline.clone());

    let result = match orchestrator.process_bytes(&bytes).await? {
        Submission::Completed(result) => result,
        Submission::Queued(id) => {
            eprintln!("  Large document, running as job {id}");
            let mut events = orchestrator.queue().subscribe(id).await?;
            let reporter = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            eprintln!("  [{:>3}%] {:<13} {}", event.percent, event.stage.as_str(), event.message);
                            if event.is_final() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            let result = orchestrator.queue().wait(id).await;
            reporter.abort();
            result?
        }
    };

    let (cache_hits, cache_misses) = pipeline.master().cache().stats();
    Ok((
        result,
        CheckStats {
            elapsed_secs: start.elapsed().as_secs_f64(),
            cache_hits,
            cache_misses,
        },
    ))
}
