//! The one coordinator that walks the source chain for a cluster.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use citecheck_core::{Citation, Cluster, VerifyConfig, names};
use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CachedChain, SourcedCandidate, VerificationCache};
use crate::courtlistener::{CitationLookup, CourtListener, OpinionSearch};
use crate::error::SourceError;
use crate::gate::{self, GateConfig};
use crate::limiter::SourceLimiter;
use crate::outcome::{VerificationAttempt, VerificationOutcome, identity_for};
use crate::query::{Candidate, ClusterQuery};
use crate::source::Verifier;
use crate::web::{HtmlSearch, USER_AGENT};

const NO_MATCH: &str = "no source returned a matching case";

/// Walks the ordered source chain for each cluster, sends every candidate
/// through the validation gate and stops at the first accepted match.
pub struct VerificationMaster {
    sources: Vec<Arc<dyn Verifier>>,
    limiter: SourceLimiter,
    cache: VerificationCache,
    config: VerifyConfig,
    gate: GateConfig,
}

/// One pass over the chain, before it is cached or turned into an outcome.
struct ChainRun {
    chain: CachedChain,
    /// At least one source answered without a transport error.
    answered: bool,
    /// Every source was consulted (or one accepted) within the budget.
    complete: bool,
}

impl ChainRun {
    /// Absence is only worth remembering when it is a real answer.
    fn cacheable(&self) -> bool {
        self.chain.accepted.is_some() || (self.answered && self.complete)
    }
}

impl VerificationMaster {
    /// Sources are consulted in the order given.
    pub fn new(sources: Vec<Arc<dyn Verifier>>, config: VerifyConfig) -> Self {
        let limiter = SourceLimiter::new(sources.iter().map(|s| s.name()), &config);
        let cache = VerificationCache::new(config.cache_capacity);
        let gate = GateConfig::from(&config);
        Self {
            sources,
            limiter,
            cache,
            config,
            gate,
        }
    }

    /// The production chain: CourtListener lookup (when a token is set),
    /// CourtListener search, then Justia, CaseMine and web search unless
    /// `primary_only` is set.
    pub fn from_config(config: &VerifyConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.source_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        let api = Arc::new(CourtListener::new(
            client.clone(),
            &config.courtlistener_base_url,
            config.courtlistener_token.clone(),
        )?);

        let mut sources: Vec<Arc<dyn Verifier>> = Vec::new();
        if api.has_token() {
            sources.push(Arc::new(CitationLookup(Arc::clone(&api))));
        } else {
            info!("no CourtListener token, citation lookup disabled");
        }
        sources.push(Arc::new(OpinionSearch(api)));
        if !config.primary_only {
            sources.push(Arc::new(HtmlSearch::justia(client.clone())?));
            sources.push(Arc::new(HtmlSearch::casemine(client.clone())?));
            sources.push(Arc::new(HtmlSearch::web(client)?));
        }

        let master = Self::new(sources, config.clone());
        info!(sources = ?master.source_names(), "verification chain ready");
        Ok(master)
    }

    /// No sources: every cluster ends unverified without network access.
    pub fn offline(config: VerifyConfig) -> Self {
        Self::new(Vec::new(), config)
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    // ── Single cluster ──

    pub async fn verify(&self, query: &ClusterQuery) -> VerificationOutcome {
        let Some(key) = query.primary_citation() else {
            return VerificationOutcome::unverified("no full citation to look up", Vec::new());
        };
        if !gate::has_usable_name(query, &self.gate) {
            debug!(citation = key, "no usable case name, skipping sources");
            return VerificationOutcome::skipped_no_name();
        }
        if self.sources.is_empty() {
            return VerificationOutcome::unverified("no verification sources configured", Vec::new());
        }

        if let Some(hit) = self.cache.get_any(&query.citations).await {
            debug!(citation = key, "verification cache hit");
            return match self.outcome_from(query, &hit, true) {
                Some(outcome) => outcome,
                None => self.run_uncached(query).await,
            };
        }

        let fresh = AtomicBool::new(false);
        let resolved = self
            .cache
            .resolve(key, async {
                fresh.store(true, Ordering::SeqCst);
                let run = self.run_chain(query).await;
                if run.cacheable() {
                    Ok(Arc::new(run.chain))
                } else {
                    Err(run.chain)
                }
            })
            .await;
        let fresh = fresh.load(Ordering::SeqCst);

        let chain = match resolved {
            Ok(chain) => {
                if fresh {
                    self.cache.insert_aliases(&query.citations[1..], &chain).await;
                }
                chain
            }
            Err(chain) => chain,
        };
        match self.outcome_from(query, &chain, !fresh) {
            Some(outcome) => outcome,
            // Shared with a concurrent cluster whose name this one does not match.
            None => self.run_uncached(query).await,
        }
    }

    async fn run_uncached(&self, query: &ClusterQuery) -> VerificationOutcome {
        let run = self.run_chain(query).await;
        self.outcome_from(query, &run.chain, false)
            .unwrap_or_else(|| VerificationOutcome::unverified(NO_MATCH, run.chain.attempts))
    }

    /// Outcome for `query` from a chain result. Every candidate the chain saw
    /// is gated again with this query's name, earliest source first. `None`
    /// when the chain stopped at a match this name rejects, since the
    /// sources after it were never asked.
    fn outcome_from(&self, query: &ClusterQuery, chain: &CachedChain, cached: bool) -> Option<VerificationOutcome> {
        let mut best: Option<(f32, &SourcedCandidate)> = None;
        for seen in &chain.seen {
            if let Some((_, found)) = best
                && found.source != seen.source
            {
                break;
            }
            if let Ok(score) = gate::validate(query, &seen.candidate, &self.gate)
                && best.is_none_or(|(s, _)| score > s)
            {
                best = Some((score, seen));
            }
        }

        let mut outcome = match best {
            Some((score, found)) => {
                let identity = identity_for(&found.candidate, &found.source, found.weight * score);
                let mut attempts = chain.attempts.clone();
                let same_match = chain
                    .accepted
                    .as_ref()
                    .is_some_and(|a| a.source == found.source && a.candidate.name == found.candidate.name);
                if !same_match {
                    attempts.push(VerificationAttempt::matched(&found.source, identity.clone(), score));
                }
                VerificationOutcome::accepted(identity, attempts)
            }
            None if chain.accepted.is_some() => return None,
            None => {
                let reason = last_reason(&chain.attempts).unwrap_or_else(|| NO_MATCH.to_string());
                VerificationOutcome::unverified(reason, chain.attempts.clone())
            }
        };
        outcome.cached = cached;
        Some(outcome)
    }

    /// Consult sources in order until one offers a candidate that passes the
    /// gate. Never runs two sources at once.
    async fn run_chain(&self, query: &ClusterQuery) -> ChainRun {
        let deadline = Instant::now() + self.config.cluster_budget();
        let mut attempts = Vec::new();
        let mut seen = Vec::new();
        let mut answered = false;
        let total = self.sources.len();

        for (i, source) in self.sources.iter().enumerate() {
            let name = source.name();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(source = name, "cluster verification budget exhausted");
                attempts.push(VerificationAttempt::failed(name, "verification budget exhausted".into()));
                return ChainRun {
                    chain: CachedChain {
                        accepted: None,
                        seen,
                        attempts,
                    },
                    answered,
                    complete: false,
                };
            }
            // Split what is left evenly over the sources still to try.
            let slot = self.config.source_timeout().min(remaining / (total - i) as u32);

            let candidates = match self.query_source(source.as_ref(), query, slot, deadline).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(source = name, error = %e, "source failed");
                    attempts.push(VerificationAttempt::failed(name, e.summary()));
                    continue;
                }
            };
            answered = true;

            if candidates.is_empty() {
                debug!(source = name, "no candidates");
                attempts.push(VerificationAttempt::rejected(name, None, None, "no candidates".into()));
                continue;
            }

            let weight = source.weight();
            seen.extend(candidates.iter().map(|candidate| SourcedCandidate {
                source: name.to_string(),
                weight,
                candidate: candidate.clone(),
            }));

            if let Some((score, candidate)) = self.best_candidate(name, query, candidates, &mut attempts) {
                let identity = identity_for(&candidate, name, weight * score);
                info!(
                    source = name,
                    citation = query.primary_citation().unwrap_or_default(),
                    name = %identity.name,
                    score,
                    "verified"
                );
                attempts.push(VerificationAttempt::matched(name, identity, score));
                return ChainRun {
                    chain: CachedChain {
                        accepted: Some(SourcedCandidate {
                            source: name.to_string(),
                            weight,
                            candidate,
                        }),
                        seen,
                        attempts,
                    },
                    answered: true,
                    complete: true,
                };
            }
        }

        info!(
            citation = query.primary_citation().unwrap_or_default(),
            sources = total,
            "no validated match"
        );
        ChainRun {
            chain: CachedChain {
                accepted: None,
                seen,
                attempts,
            },
            answered,
            complete: true,
        }
    }

    /// Highest-scoring candidate that passes the gate; rejections are logged
    /// to `attempts`.
    fn best_candidate(
        &self,
        source: &str,
        query: &ClusterQuery,
        candidates: Vec<Candidate>,
        attempts: &mut Vec<VerificationAttempt>,
    ) -> Option<(f32, Candidate)> {
        let mut best: Option<(f32, Candidate)> = None;
        for candidate in candidates {
            match gate::validate(query, &candidate, &self.gate) {
                Ok(score) => {
                    if best.as_ref().is_none_or(|(s, _)| score > *s) {
                        best = Some((score, candidate));
                    }
                }
                Err(rejection) => {
                    debug!(source, candidate = %candidate.name, %rejection, "candidate rejected");
                    let similarity = query
                        .case_name
                        .as_deref()
                        .map(|n| names::overlap_score(n, &candidate.name));
                    attempts.push(VerificationAttempt::rejected(
                        source,
                        Some(identity_for(&candidate, source, 0.0)),
                        similarity,
                        rejection.to_string(),
                    ));
                }
            }
        }
        best
    }

    /// One source call under the rate limit, retried once on a retryable
    /// error. Nothing here runs past `deadline`, the retry included.
    async fn query_source(
        &self,
        source: &dyn Verifier,
        query: &ClusterQuery,
        slot: Duration,
        deadline: Instant,
    ) -> Result<Vec<Candidate>, SourceError> {
        let mut retried = false;
        loop {
            if tokio::time::timeout_at(deadline, self.limiter.until_ready(source.name()))
                .await
                .is_err()
            {
                return Err(SourceError::Timeout(slot));
            }
            let limit = slot.min(deadline.saturating_duration_since(Instant::now()));
            let result = match tokio::time::timeout(limit, source.lookup(query)).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout(limit)),
            };
            let left = deadline.saturating_duration_since(Instant::now());
            match result {
                Err(e) if e.is_retryable() && !retried && left > self.config.retry_delay() => {
                    warn!(source = source.name(), error = %e, "retrying once");
                    retried = true;
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                other => return other,
            }
        }
    }

    // ── All clusters ──

    /// Verify every cluster with up to `workers` in flight, then write each
    /// outcome onto its cluster. Cancellation is checked before each cluster
    /// starts; clusters not started are marked cancelled. `on_done` is called
    /// with `(finished, total)` as clusters complete.
    pub async fn verify_all<F>(
        &self,
        citations: &[Citation],
        clusters: &mut [Cluster],
        cancel: &CancellationToken,
        mut on_done: F,
    ) -> Vec<VerificationOutcome>
    where
        F: FnMut(usize, usize),
    {
        let total = clusters.len();
        let queries: Vec<ClusterQuery> = clusters
            .iter()
            .map(|c| ClusterQuery::from_cluster(citations, c))
            .collect();

        let mut outcomes: Vec<Option<VerificationOutcome>> = vec![None; total];
        let queries = &queries;
        let mut pending = futures::stream::iter(0..total)
            .map(|i| async move {
                let query = &queries[i];
                if cancel.is_cancelled() {
                    return (i, VerificationOutcome::cancelled());
                }
                (i, self.verify(query).await)
            })
            .buffer_unordered(self.config.workers.max(1));

        let mut finished = 0;
        while let Some((i, outcome)) = pending.next().await {
            finished += 1;
            on_done(finished, total);
            outcomes[i] = Some(outcome);
        }

        let outcomes: Vec<VerificationOutcome> = outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(VerificationOutcome::cancelled))
            .collect();
        for (cluster, outcome) in clusters.iter_mut().zip(&outcomes) {
            match outcome.identity() {
                Some(identity) => cluster.set_identity(identity),
                None => cluster.mark_unverified(outcome.reason.clone().unwrap_or_else(|| NO_MATCH.to_string())),
            }
        }

        let verified = outcomes.iter().filter(|o| o.verified()).count();
        info!(clusters = total, verified, cancelled = cancel.is_cancelled(), "verification finished");
        outcomes
    }
}

/// Most recent rejection or failure, for display next to "unverified".
fn last_reason(attempts: &[VerificationAttempt]) -> Option<String> {
    attempts
        .iter()
        .rev()
        .find_map(|a| a.error.as_ref().map(|e| format!("{}: {e}", a.source_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeStatus;
    use crate::testing::StaticVerifier;
    use citecheck_core::{ClusterConfig, Jurisdiction};

    fn config() -> VerifyConfig {
        VerifyConfig {
            min_request_interval_ms: 0,
            retry_delay_ms: 10,
            ..VerifyConfig::default()
        }
    }

    fn master(sources: &[Arc<StaticVerifier>]) -> VerificationMaster {
        let sources = sources
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn Verifier>)
            .collect();
        VerificationMaster::new(sources, config())
    }

    fn doe_query() -> ClusterQuery {
        ClusterQuery::new("123 Wn.2d 45", Some("Doe v. Roe"), Some("1999"))
    }

    fn doe() -> Candidate {
        Candidate::new("Doe v. Roe")
            .with_date("1999-03-04")
            .with_url("https://example.org/doe")
    }

    #[tokio::test]
    async fn first_accepted_source_wins() {
        let first = StaticVerifier::returning("first", vec![doe()]).with_weight(0.95).shared();
        let second = StaticVerifier::returning("second", vec![doe()]).shared();
        let outcome = master(&[first.clone(), second.clone()]).verify(&doe_query()).await;

        assert_eq!(outcome.status, OutcomeStatus::Verified);
        assert_eq!(outcome.source.as_deref(), Some("first"));
        assert_eq!(outcome.canonical_name.as_deref(), Some("Doe v. Roe"));
        assert_eq!(outcome.canonical_date.as_deref(), Some("1999-03-04"));
        assert_eq!(outcome.confidence, Some(0.95));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_candidate_falls_through_to_next_source() {
        let wrong = StaticVerifier::returning("wrong", vec![Candidate::new("Smith v. Jones")]).shared();
        let right = StaticVerifier::returning("right", vec![doe()]).shared();
        let outcome = master(&[wrong.clone(), right.clone()]).verify(&doe_query()).await;

        assert!(outcome.verified());
        assert_eq!(outcome.source.as_deref(), Some("right"));
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].matched);
        assert!(outcome.attempts[1].matched);
    }

    #[tokio::test]
    async fn best_candidate_within_a_source_chosen() {
        let source = StaticVerifier::returning(
            "search",
            vec![Candidate::new("Doe v. Roe Holdings Widget Co."), Candidate::new("Doe v. Roe")],
        )
        .shared();
        let outcome = master(&[source]).verify(&doe_query()).await;
        assert_eq!(outcome.canonical_name.as_deref(), Some("Doe v. Roe"));
    }

    #[tokio::test]
    async fn all_sources_non_matching_fails_closed() {
        let a = StaticVerifier::returning("a", vec![Candidate::new("Smith v. Jones")]).shared();
        let b = StaticVerifier::returning("b", vec![Candidate::new("Brown v. Board of Education")]).shared();
        let c = StaticVerifier::failing("c", 500).shared();
        let outcome = master(&[a, b, c]).verify(&doe_query()).await;

        assert_eq!(outcome.status, OutcomeStatus::Unverified);
        assert!(!outcome.verified());
        assert_eq!(outcome.canonical_name, None);
        assert_eq!(outcome.canonical_date, None);
        assert_eq!(outcome.canonical_url, None);
        assert_eq!(outcome.source, None);
        assert_eq!(outcome.confidence, None);
        assert!(outcome.reason.is_some());
    }

    #[tokio::test]
    async fn other_state_candidate_rejected() {
        let source = StaticVerifier::returning(
            "search",
            vec![Candidate::new("Doe v. Roe").with_jurisdiction(Jurisdiction::State("or".into()))],
        )
        .shared();
        let outcome = master(&[source]).verify(&doe_query()).await;
        assert!(!outcome.verified());
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("state:or"));
    }

    #[tokio::test]
    async fn nameless_cluster_skips_every_source() {
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        for name in [None, Some("Id.")] {
            let outcome = m.verify(&ClusterQuery::new("123 Wn.2d 45", name, None)).await;
            assert_eq!(outcome.status, OutcomeStatus::SkippedNoName);
        }
        assert_eq!(source.calls(), 0);
        assert!(m.cache().is_empty().await);
    }

    #[tokio::test]
    async fn server_error_retried_once() {
        let flaky = StaticVerifier::failing_once("flaky", 503, vec![doe()]).shared();
        let outcome = master(&[flaky.clone()]).verify(&doe_query()).await;
        assert!(outcome.verified());
        assert_eq!(flaky.calls(), 2);
    }

    #[tokio::test]
    async fn client_error_not_retried() {
        let missing = StaticVerifier::failing("missing", 404).shared();
        let next = StaticVerifier::returning("next", vec![doe()]).shared();
        let outcome = master(&[missing.clone(), next]).verify(&doe_query()).await;
        assert!(outcome.verified());
        assert_eq!(missing.calls(), 1);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn repeated_citation_queries_once() {
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        let first = m.verify(&doe_query()).await;
        let second = m.verify(&doe_query()).await;
        assert!(first.verified() && second.verified());
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn parallel_citation_hits_shared_entry() {
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        let mut both = doe_query();
        both.citations.push("456 P.3d 78".into());
        assert!(m.verify(&both).await.verified());

        let alias = ClusterQuery::new("456 P.3d 78", Some("Doe v. Roe"), None);
        assert!(m.verify(&alias).await.cached);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn cached_match_regated_for_a_different_name() {
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        assert!(m.verify(&doe_query()).await.verified());

        let other = ClusterQuery::new("123 Wn.2d 45", Some("Smith v. Jones"), None);
        let outcome = m.verify(&other).await;
        assert!(!outcome.verified());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn cached_absence_regated_for_a_different_name() {
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        let wrong = ClusterQuery::new("123 Wn.2d 45", Some("Smith v. Jones"), Some("1999"));
        assert!(!m.verify(&wrong).await.verified());

        let outcome = m.verify(&doe_query()).await;
        assert!(outcome.verified());
        assert!(outcome.cached);
        assert_eq!(outcome.canonical_name.as_deref(), Some("Doe v. Roe"));
        assert_eq!(outcome.source.as_deref(), Some("search"));
        assert!(outcome.attempts.last().unwrap().matched);

        // The absence still holds for the name that produced it.
        assert!(!m.verify(&wrong).await.verified());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn name_order_does_not_change_outcomes() {
        let wrong = ClusterQuery::new("123 Wn.2d 45", Some("Smith v. Jones"), None);
        for order in [[wrong.clone(), doe_query()], [doe_query(), wrong.clone()]] {
            let source = StaticVerifier::returning("search", vec![doe()]).shared();
            let m = master(&[source]);
            let mut verified = Vec::new();
            for query in &order {
                verified.push((query.case_name.clone(), m.verify(query).await.verified()));
            }
            verified.sort();
            assert_eq!(
                verified,
                vec![(Some("Doe v. Roe".to_string()), true), (Some("Smith v. Jones".to_string()), false)]
            );
        }
    }

    #[tokio::test]
    async fn transport_failures_not_cached() {
        let down = StaticVerifier::failing("down", 404).shared();
        let m = master(&[down.clone()]);
        assert!(!m.verify(&doe_query()).await.verified());
        assert!(!m.verify(&doe_query()).await.verified());
        assert_eq!(down.calls(), 2);
        assert!(m.cache().is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_chain_run() {
        let slow = StaticVerifier::returning("slow", vec![doe()])
            .with_delay(Duration::from_millis(100))
            .shared();
        let m = master(&[slow.clone()]);
        let query = doe_query();
        let (a, b) = tokio::join!(m.verify(&query), m.verify(&query));
        assert!(a.verified() && b.verified());
        assert_eq!(slow.calls(), 1);
        assert!(a.cached != b.cached);
    }

    #[tokio::test]
    async fn slow_source_times_out_and_chain_continues() {
        let slow = StaticVerifier::returning("slow", vec![doe()])
            .with_delay(Duration::from_secs(5))
            .shared();
        let fast = StaticVerifier::returning("fast", vec![doe()]).shared();
        let sources = vec![slow.clone() as Arc<dyn Verifier>, fast as Arc<dyn Verifier>];
        let m = VerificationMaster::new(
            sources,
            VerifyConfig {
                source_timeout_secs: 1,
                ..config()
            },
        );
        let outcome = m.verify(&doe_query()).await;
        assert_eq!(outcome.source.as_deref(), Some("fast"));
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("timed out"));
        // Timeouts are retryable.
        assert_eq!(slow.calls(), 2);
    }

    fn slow_sources(names: &[&str]) -> Vec<Arc<StaticVerifier>> {
        names
            .iter()
            .map(|name| {
                StaticVerifier::returning(name, vec![doe()])
                    .with_delay(Duration::from_secs(10))
                    .shared()
            })
            .collect()
    }

    fn budgeted(sources: &[Arc<StaticVerifier>], budget_secs: u64, retry_delay_ms: u64) -> VerificationMaster {
        let sources = sources
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn Verifier>)
            .collect();
        VerificationMaster::new(
            sources,
            VerifyConfig {
                source_timeout_secs: 2,
                cluster_budget_secs: budget_secs,
                retry_delay_ms,
                ..config()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn cluster_budget_split_over_remaining_sources() {
        let slow = slow_sources(&["a", "b", "c"]);
        let m = budgeted(&slow, 3, 500);

        let start = Instant::now();
        let outcome = m.verify(&doe_query()).await;
        let elapsed = start.elapsed();

        assert_eq!(outcome.status, OutcomeStatus::Unverified);
        assert!(elapsed <= Duration::from_millis(3_010), "took {elapsed:?}");
        assert!(elapsed >= Duration::from_millis(2_900), "took {elapsed:?}");
        assert_eq!(outcome.attempts.len(), 3);
        for attempt in &outcome.attempts {
            assert!(attempt.error.as_deref().unwrap().contains("timed out"), "{attempt:?}");
        }
        // a: 1s slot, retried after 0.5s. b: 0.25s left over, too little to retry.
        assert_eq!(slow[0].calls(), 2);
        assert_eq!(slow[1].calls(), 1);
        assert_eq!(slow[2].calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_stops_the_chain() {
        let slow = slow_sources(&["a", "b"]);
        let m = budgeted(&slow, 2, 100);

        let start = Instant::now();
        let outcome = m.verify(&doe_query()).await;
        let elapsed = start.elapsed();

        assert!(elapsed <= Duration::from_millis(2_010), "took {elapsed:?}");
        assert_eq!(slow[0].calls(), 2);
        assert_eq!(slow[1].calls(), 0);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(outcome.attempts[1].error.as_deref(), Some("verification budget exhausted"));
        assert!(m.cache().is_empty().await);
    }

    #[tokio::test]
    async fn offline_master_leaves_everything_unverified() {
        let m = VerificationMaster::offline(config());
        let outcome = m.verify(&doe_query()).await;
        assert_eq!(outcome.status, OutcomeStatus::Unverified);
        assert!(m.source_names().is_empty());
    }

    #[tokio::test]
    async fn verify_all_writes_outcomes_onto_clusters() {
        let text = "Doe v. Roe, 123 Wn.2d 45, 456 P.3d 78 (1999). Id. at 47. \
                    See Smith v. Jones, 5 F.3d 10 (9th Cir. 1993).";
        let mut citations = citecheck_extract::extract(text);
        let mut clusters = citecheck_cluster::cluster(&mut citations, &ClusterConfig::default());
        assert_eq!(clusters.len(), 2);

        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source]);
        let mut progress = Vec::new();
        let outcomes = m
            .verify_all(&citations, &mut clusters, &CancellationToken::new(), |done, total| {
                progress.push((done, total))
            })
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(progress.last(), Some(&(2, 2)));
        let doe_cluster = clusters.iter().find(|c| c.case_name.as_deref() == Some("Doe v. Roe")).unwrap();
        assert!(doe_cluster.verified);
        let smith = clusters.iter().find(|c| c.case_name.as_deref() == Some("Smith v. Jones")).unwrap();
        assert!(!smith.verified);
        assert!(smith.canonical_identity.is_none());
        assert!(smith.unverified_reason.is_some());
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_no_source() {
        let mut citations = citecheck_extract::extract("Doe v. Roe, 123 Wn.2d 45 (1999).");
        let mut clusters = citecheck_cluster::cluster(&mut citations, &ClusterConfig::default());
        let source = StaticVerifier::returning("search", vec![doe()]).shared();
        let m = master(&[source.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = m.verify_all(&citations, &mut clusters, &cancel, |_, _| {}).await;
        assert_eq!(outcomes[0].status, OutcomeStatus::Cancelled);
        assert_eq!(source.calls(), 0);
        assert!(!clusters[0].verified);
        assert_eq!(clusters[0].unverified_reason.as_deref(), Some("cancelled"));
    }
}
