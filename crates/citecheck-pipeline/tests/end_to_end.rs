//! Whole-pipeline behaviour with scripted sources: no network.

use std::collections::HashSet;
use std::sync::Arc;

use citecheck_core::{CitationKind, ClusterConfig, Config, Jurisdiction, VerifyConfig};
use citecheck_extract::Extractor;
use citecheck_pipeline::eval::{evaluate, parse_labels};
use citecheck_pipeline::{Orchestrator, Pipeline, Submission};
use citecheck_verify::testing::StaticVerifier;
use citecheck_verify::{Candidate, VerificationMaster, Verifier};
use tokio_util::sync::CancellationToken;

const PARALLEL: &str = "Doe v. Roe, 123 Wn.2d 45, 456 P.3d 78 (1999). Id. at 47.";

const MIXED: &str = "See Brown v. Board of Education, 347 U.S. 483 (1954). \
    Smith v. Jones, 5 F.3d 10 (9th Cir. 1993). The panel reversed. Smith, 5 F.3d at 12. \
    Doe v. Roe, 123 Wn.2d 45, 456 P.3d 78 (1999). Id. at 47. Brown, 347 U.S. at 495.";

fn pipeline(sources: Vec<Arc<StaticVerifier>>) -> Pipeline {
    let config = VerifyConfig {
        min_request_interval_ms: 0,
        retry_delay_ms: 10,
        ..VerifyConfig::default()
    };
    let sources = sources.into_iter().map(|s| s as Arc<dyn Verifier>).collect();
    let master = VerificationMaster::new(sources, config);
    Pipeline::new(Extractor::default(), ClusterConfig::default(), Arc::new(master))
}

async fn run(pipeline: &Pipeline, text: &str) -> citecheck_core::ProcessResult {
    pipeline.run(text, &CancellationToken::new(), |_| {}).await
}

// ── Clustering ──

#[test]
fn every_citation_lands_in_exactly_one_cluster() {
    let result = Pipeline::offline(&Config::default()).extract_and_cluster(MIXED);
    assert_eq!(result.citations.len(), 7);

    let mut seen = HashSet::new();
    for cluster in &result.clusters {
        for id in &cluster.member_citation_ids {
            assert!(seen.insert(*id), "{id:?} in two clusters");
        }
    }
    assert_eq!(seen.len(), result.citations.len());
    for citation in &result.citations {
        let cluster = result.cluster(citation.cluster_id.unwrap()).unwrap();
        assert!(cluster.member_citation_ids.contains(&citation.id));
    }
}

#[test]
fn reclustering_reproduces_the_partition() {
    let first = Pipeline::offline(&Config::default()).extract_and_cluster(MIXED);
    let mut citations = first.citations.clone();
    let again = citecheck_cluster::cluster(&mut citations, &ClusterConfig::default());

    let members = |clusters: &[citecheck_core::Cluster]| {
        clusters.iter().map(|c| c.member_citation_ids.clone()).collect::<Vec<_>>()
    };
    assert_eq!(members(&first.clusters), members(&again));
    assert_eq!(citations, first.citations);
}

#[test]
fn short_forms_and_id_join_their_case() {
    let result = Pipeline::offline(&Config::default()).extract_and_cluster(MIXED);
    assert_eq!(result.clusters.len(), 3);

    let brown = result.cluster(result.citations[0].cluster_id.unwrap()).unwrap();
    assert_eq!(brown.case_name.as_deref(), Some("Brown v. Board of Education"));
    assert_eq!(brown.member_citation_ids.len(), 2);

    let short = &result.citations[2];
    assert_eq!(short.kind, CitationKind::Short);
    assert_eq!(short.cluster_id, result.citations[1].cluster_id);
    assert_eq!(short.extracted_case_name.as_deref(), Some("Smith v. Jones"));
}

// ── Verification ──

#[tokio::test]
async fn verified_identity_reaches_parallel_and_id() {
    let source = StaticVerifier::returning(
        "search",
        vec![
            Candidate::new("Doe v. Roe")
                .with_date("1999-03-04")
                .with_url("https://example.org/doe-v-roe")
                .with_jurisdiction(Jurisdiction::State("wa".into())),
        ],
    )
    .shared();
    let result = run(&pipeline(vec![Arc::clone(&source)]), PARALLEL).await;

    assert_eq!(result.clusters.len(), 1);
    assert!(result.clusters[0].verified);
    assert_eq!(source.calls(), 1);
    for citation in &result.citations {
        assert_eq!(citation.canonical_name(), Some("Doe v. Roe"));
        assert_eq!(citation.canonical_date(), Some("1999-03-04"));
        assert_eq!(citation.canonical_url(), Some("https://example.org/doe-v-roe"));
        assert!(citation.verified());
    }
}

#[tokio::test]
async fn id_never_carries_its_own_name() {
    let citations = Extractor::default().extract(PARALLEL);
    assert_eq!(citations[2].kind, CitationKind::Id);
    assert_eq!(citations[2].extracted_case_name, None);

    let result = run(&Pipeline::offline(&Config::default()), PARALLEL).await;
    let id = &result.citations[2];
    assert!(id.name_propagated);
    assert_eq!(id.extracted_case_name.as_deref(), Some("Doe v. Roe"));
}

#[tokio::test]
async fn wrong_case_at_same_citation_stays_unverified() {
    let source = StaticVerifier::returning("search", vec![Candidate::new("Smith v. Jones")]).shared();
    let result = run(&pipeline(vec![source]), PARALLEL).await;

    assert!(!result.clusters[0].verified);
    assert!(result.clusters[0].canonical_identity.is_none());
    assert!(result.clusters[0].unverified_reason.is_some());
    assert!(result.citations.iter().all(|c| c.canonical_name().is_none() && !c.verified()));
}

#[tokio::test]
async fn other_state_rejected_even_with_matching_name() {
    let source = StaticVerifier::returning(
        "search",
        vec![Candidate::new("Doe v. Roe").with_court("Supreme Court of Oregon")],
    )
    .shared();
    let result = run(&pipeline(vec![source]), PARALLEL).await;
    assert!(!result.clusters[0].verified);
    assert_eq!(result.verified_count(), 0);
}

#[tokio::test]
async fn failing_sources_fail_closed() {
    let down = StaticVerifier::failing("lookup", 503).shared();
    let wrong = StaticVerifier::returning("search", vec![Candidate::new("Smith v. Jones")]).shared();
    let result = run(&pipeline(vec![Arc::clone(&down), wrong]), PARALLEL).await;

    assert!(down.calls() >= 1);
    assert!(!result.clusters[0].verified);
    assert!(result.citations.iter().all(|c| c.canonical_name().is_none()));
}

#[tokio::test]
async fn later_source_verifies_after_earlier_failure() {
    let down = StaticVerifier::failing("lookup", 500).shared();
    let search = StaticVerifier::returning("search", vec![Candidate::new("Doe v. Roe")]).shared();
    let result = run(&pipeline(vec![down, search]), PARALLEL).await;

    assert!(result.clusters[0].verified);
    assert_eq!(result.citations[0].verification_source(), Some("search"));
}

#[tokio::test]
async fn cancelled_run_leaves_clusters_unverified() {
    let source = StaticVerifier::returning("search", vec![Candidate::new("Doe v. Roe")]).shared();
    let pipeline = pipeline(vec![Arc::clone(&source)]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.run(PARALLEL, &cancel, |_| {}).await;
    assert_eq!(source.calls(), 0);
    assert!(!result.clusters[0].verified);
    assert_eq!(result.clusters[0].unverified_reason.as_deref(), Some("cancelled"));
}

// ── Orchestration ──

#[tokio::test]
async fn queued_and_inline_runs_agree() {
    let source = StaticVerifier::returning("search", vec![Candidate::new("Doe v. Roe")]).shared();
    let pipeline = Arc::new(pipeline(vec![source]));
    let inline = pipeline.run(PARALLEL, &CancellationToken::new(), |_| {}).await;

    let config = citecheck_core::PipelineConfig {
        sync_threshold_bytes: 1,
        max_concurrent_jobs: 1,
    };
    let orchestrator = Orchestrator::new(pipeline, config);
    let Submission::Queued(id) = orchestrator.process(PARALLEL).await.unwrap() else {
        panic!("expected a queued job");
    };
    let queued = orchestrator.queue().wait(id).await.unwrap();
    assert_eq!(queued.citations, inline.citations);
    assert_eq!(queued.clusters, inline.clusters);
}

// ── Accuracy ──

#[test]
fn labelled_corpus_meets_accuracy_floor() {
    let docs = parse_labels(include_str!("fixtures/labeled.json")).unwrap();
    assert_eq!(docs.len(), 10);

    let report = evaluate(&Pipeline::offline(&Config::default()), &docs);
    for doc in &report.documents {
        assert_eq!(doc.found, doc.labeled, "{}: {:?}", doc.name, doc.mismatches);
    }
    assert!(
        report.accuracy() >= 0.95,
        "accuracy {:.3}: {:?}",
        report.accuracy(),
        report.documents.iter().flat_map(|d| &d.mismatches).collect::<Vec<_>>()
    );
    assert_eq!(report.conflicting_clusters(), 0);
}
