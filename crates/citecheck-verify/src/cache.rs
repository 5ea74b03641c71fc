//! Chain results keyed by normalized citation text.
//!
//! Concurrent misses for one key run the source chain once; the other
//! callers wait for that run and share its result.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

use crate::outcome::VerificationAttempt;
use crate::query::Candidate;

/// Entries older than this are looked up again.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A candidate as a source returned it, kept raw so a hit can be re-gated
/// against the name of the cluster asking.
#[derive(Debug, Clone)]
pub(crate) struct SourcedCandidate {
    pub source: String,
    pub weight: f32,
    pub candidate: Candidate,
}

/// Result of one full run of the source chain.
#[derive(Debug, Clone)]
pub(crate) struct CachedChain {
    pub accepted: Option<SourcedCandidate>,
    /// Every candidate returned, in source order. Complete for an absence,
    /// so another name can be judged without asking the sources again.
    pub seen: Vec<SourcedCandidate>,
    pub attempts: Vec<VerificationAttempt>,
}

pub struct VerificationCache {
    cache: Cache<String, Arc<CachedChain>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl VerificationCache {
    pub fn new(capacity: u64) -> Self {
        Self::with_ttl(capacity, DEFAULT_TTL)
    }

    pub fn with_ttl(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// First entry found under any of `keys` (a cluster's parallel citations).
    pub(crate) async fn get_any(&self, keys: &[String]) -> Option<Arc<CachedChain>> {
        for key in keys {
            if let Some(hit) = self.cache.get(key).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(hit);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Return the entry for `key`, running `init` when absent. Concurrent
    /// calls for the same key share one `init`. An `Err` from `init` is an
    /// uncacheable result: it is handed to every waiting caller and nothing
    /// is stored.
    pub(crate) async fn resolve<F>(&self, key: &str, init: F) -> Result<Arc<CachedChain>, Arc<CachedChain>>
    where
        F: Future<Output = Result<Arc<CachedChain>, CachedChain>>,
    {
        self.cache.try_get_with(key.to_string(), init).await
    }

    /// Store `chain` under the remaining parallel citations of a cluster.
    pub(crate) async fn insert_aliases(&self, keys: &[String], chain: &Arc<CachedChain>) {
        for key in keys {
            if !self.cache.contains_key(key) {
                self.cache.insert(key.clone(), Arc::clone(chain)).await;
            }
        }
    }

    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// `(hits, misses)` of [`get_any`](Self::get_any) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(name: Option<&str>) -> CachedChain {
        CachedChain {
            accepted: name.map(|n| SourcedCandidate {
                source: "justia".into(),
                weight: 0.8,
                candidate: Candidate::new(n),
            }),
            seen: Vec::new(),
            attempts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn resolve_stores_ok_results_only() {
        let cache = VerificationCache::new(10);
        let stored = cache
            .resolve("1 U.S. 1", async { Ok(Arc::new(chain(Some("Doe v. Roe")))) })
            .await
            .unwrap();
        assert!(stored.accepted.is_some());

        let uncached = cache.resolve("2 U.S. 2", async { Err(chain(None)) }).await;
        assert!(uncached.is_err());

        assert!(cache.get_any(&["2 U.S. 2".into()]).await.is_none());
        assert!(cache.get_any(&["2 U.S. 2".into(), "1 U.S. 1".into()]).await.is_some());
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[tokio::test]
    async fn aliases_share_the_entry() {
        let cache = VerificationCache::new(10);
        let entry = Arc::new(chain(Some("Doe v. Roe")));
        cache
            .insert_aliases(&["123 Wn.2d 45".into(), "456 P.3d 78".into()], &entry)
            .await;
        let hit = cache.get_any(&["456 P.3d 78".into()]).await.unwrap();
        assert!(Arc::ptr_eq(&hit, &entry));
        cache.invalidate_all();
        assert!(cache.get_any(&["456 P.3d 78".into()]).await.is_none());
    }
}
