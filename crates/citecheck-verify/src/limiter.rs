//! Per-source minimum spacing between requests.

use std::collections::HashMap;
use std::sync::Arc;

use citecheck_core::VerifyConfig;
use governor::{Quota, RateLimiter};
use tracing::debug;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// One limiter per source name. Sources with a zero interval are unlimited.
#[derive(Default)]
pub struct SourceLimiter {
    limiters: HashMap<String, Arc<DirectLimiter>>,
}

impl SourceLimiter {
    pub fn new<'a>(sources: impl IntoIterator<Item = &'a str>, config: &VerifyConfig) -> Self {
        let limiters = sources
            .into_iter()
            .filter_map(|name| {
                let quota = Quota::with_period(config.request_interval(name))?;
                Some((name.to_string(), Arc::new(RateLimiter::direct(quota))))
            })
            .collect();
        Self { limiters }
    }

    /// Wait until the named source may be called again.
    pub async fn until_ready(&self, source: &str) {
        if let Some(limiter) = self.limiters.get(source)
            && limiter.check().is_err()
        {
            debug!(source, "waiting for rate limit");
            limiter.until_ready().await;
        }
    }

    pub fn is_limited(&self, source: &str) -> bool {
        self.limiters.contains_key(source)
    }
}
