//! CourtListener REST API: exact citation lookup and opinion search.

use std::sync::Arc;

use async_trait::async_trait;
use citecheck_core::jurisdiction::Jurisdiction;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{SourceError, check_status};
use crate::query::{Candidate, ClusterQuery};
use crate::source::Verifier;

pub const LOOKUP_SOURCE: &str = "courtlistener-lookup";
pub const SEARCH_SOURCE: &str = "courtlistener-search";

/// HTTP client for CourtListener's v4 API.
pub struct CourtListener {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

// ── Response shapes ──

#[derive(Deserialize)]
struct LookupEntry {
    #[serde(default)]
    citation: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    clusters: Vec<LookupCluster>,
}

#[derive(Deserialize)]
struct LookupCluster {
    #[serde(default)]
    case_name: String,
    #[serde(default)]
    case_name_full: String,
    date_filed: Option<String>,
    absolute_url: Option<String>,
    court_id: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(rename = "caseName", default)]
    case_name: String,
    #[serde(rename = "dateFiled")]
    date_filed: Option<String>,
    absolute_url: Option<String>,
    court: Option<String>,
    court_id: Option<String>,
}

impl CourtListener {
    /// `base_url` should be like `https://www.courtlistener.com`.
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<String>) -> Result<Self, SourceError> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {token}")),
            None => request,
        }
    }

    /// `POST /api/rest/v4/citation-lookup/` with every citation of the cluster.
    pub async fn citation_lookup(&self, citations: &[String]) -> Result<Vec<Candidate>, SourceError> {
        let url = self.base_url.join("api/rest/v4/citation-lookup/")?;
        let text = citations.join("; ");
        debug!(url = %url, text = %text, "citation lookup");
        let resp = self
            .authorize(self.client.post(url))
            .form(&[("text", text.as_str())])
            .send()
            .await?;
        let body = check_status(resp).await?.text().await?;
        let candidates = parse_lookup(&body, &self.base_url)?;
        info!(count = candidates.len(), "citation lookup returned");
        Ok(candidates)
    }

    /// `GET /api/rest/v4/search/?type=o&q=...`.
    pub async fn search(&self, q: &str) -> Result<Vec<Candidate>, SourceError> {
        let url = self.base_url.join("api/rest/v4/search/")?;
        debug!(url = %url, q = %q, "opinion search");
        let resp = self
            .authorize(self.client.get(url))
            .query(&[("type", "o"), ("q", q)])
            .send()
            .await?;
        let body = check_status(resp).await?.text().await?;
        let candidates = parse_search(&body, &self.base_url)?;
        info!(count = candidates.len(), "opinion search returned");
        Ok(candidates)
    }
}

fn absolute(base: &Url, path: Option<&str>) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    base.join(path).ok().map(String::from)
}

fn court_jurisdiction(court_id: Option<&str>, court: Option<&str>) -> Jurisdiction {
    court_id
        .map(Jurisdiction::from_court_id)
        .filter(Jurisdiction::is_specific)
        .or_else(|| court.map(Jurisdiction::from_court_text))
        .unwrap_or_default()
}

/// Candidates from a citation-lookup response. Entries whose status is not
/// 200 (unknown or ambiguous citations) contribute nothing.
pub(crate) fn parse_lookup(body: &str, base: &Url) -> Result<Vec<Candidate>, SourceError> {
    let entries: Vec<LookupEntry> = serde_json::from_str(body)?;
    let mut candidates = Vec::new();
    for entry in entries {
        if entry.status != 200 {
            debug!(citation = %entry.citation, status = entry.status, "lookup entry skipped");
            continue;
        }
        for cluster in entry.clusters {
            let name = if cluster.case_name.trim().is_empty() {
                cluster.case_name_full
            } else {
                cluster.case_name
            };
            if name.trim().is_empty() {
                continue;
            }
            let mut candidate = Candidate::new(name.trim())
                .with_jurisdiction(court_jurisdiction(cluster.court_id.as_deref(), None));
            candidate.date = cluster.date_filed;
            candidate.url = absolute(base, cluster.absolute_url.as_deref());
            candidate.court = cluster.court_id;
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}

pub(crate) fn parse_search(body: &str, base: &Url) -> Result<Vec<Candidate>, SourceError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .filter(|r| !r.case_name.trim().is_empty())
        .map(|r| {
            let jurisdiction = court_jurisdiction(r.court_id.as_deref(), r.court.as_deref());
            let mut candidate = Candidate::new(r.case_name.trim()).with_jurisdiction(jurisdiction);
            candidate.date = r.date_filed;
            candidate.url = absolute(base, r.absolute_url.as_deref());
            candidate.court = r.court.or(r.court_id);
            candidate
        })
        .collect())
}

/// Search text: the primary citation and the case name, both quoted.
fn search_query(query: &ClusterQuery) -> Option<String> {
    let citation = query.primary_citation()?;
    Some(match query.case_name.as_deref() {
        Some(name) => format!("\"{citation}\" \"{name}\""),
        None => format!("\"{citation}\""),
    })
}

// ── Chain sources ──

/// Exact citation lookup. Requires an API token.
pub struct CitationLookup(pub Arc<CourtListener>);

#[async_trait]
impl Verifier for CitationLookup {
    fn name(&self) -> &str {
        LOOKUP_SOURCE
    }

    fn weight(&self) -> f32 {
        0.95
    }

    async fn lookup(&self, query: &ClusterQuery) -> Result<Vec<Candidate>, SourceError> {
        self.0.citation_lookup(&query.citations).await
    }
}

/// Free-text opinion search on citation and case name.
pub struct OpinionSearch(pub Arc<CourtListener>);

#[async_trait]
impl Verifier for OpinionSearch {
    fn name(&self) -> &str {
        SEARCH_SOURCE
    }

    fn weight(&self) -> f32 {
        0.9
    }

    async fn lookup(&self, query: &ClusterQuery) -> Result<Vec<Candidate>, SourceError> {
        let Some(q) = search_query(query) else {
            return Ok(Vec::new());
        };
        self.0.search(&q).await
    }
}
