//! Fallback HTML search sources: legal search engines, then general web
//! search restricted to authoritative domains.

use std::sync::LazyLock;

use async_trait::async_trait;
use citecheck_core::jurisdiction::Jurisdiction;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{SourceError, check_status};
use crate::query::{Candidate, ClusterQuery};
use crate::source::Verifier;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; citecheck/0.1; +https://github.com/citecheck/citecheck)";

/// Hosts whose pages are accepted from general web search.
pub const AUTHORITATIVE_DOMAINS: &[&str] = &[
    "courtlistener.com",
    "law.justia.com",
    "casetext.com",
    "leagle.com",
    "casemine.com",
    "findlaw.com",
    "courts.wa.gov",
    "supremecourt.gov",
    "scholar.google.com",
    "govinfo.gov",
];

static TRAILING_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",?\s+\d{1,4}\s+[A-Z][A-Za-z.' ]*\d*[a-z]*\.?\s+\d+.*$").unwrap());

static TRAILING_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").unwrap());

static PAREN_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((?:[^()]*\D)?(\d{4})\)").unwrap());

static ANY_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(1[6-9]\d{2}|20\d{2})\b").unwrap());

/// CSS selectors locating results on a search page.
struct ResultSelectors {
    item: Selector,
    title: Selector,
    link: Selector,
    snippet: Selector,
}

impl ResultSelectors {
    fn parse(item: &str, title: &str, link: &str, snippet: &str) -> Result<Self, SourceError> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| SourceError::Parse(format!("selector {s:?}: {e}")));
        Ok(Self {
            item: parse(item)?,
            title: parse(title)?,
            link: parse(link)?,
            snippet: parse(snippet)?,
        })
    }
}

/// One search engine scraped for result titles and links.
pub struct HtmlSearch {
    name: &'static str,
    weight: f32,
    client: reqwest::Client,
    /// Search URL; the query is appended as the `param` query parameter.
    search_url: Url,
    param: &'static str,
    selectors: ResultSelectors,
    allowed_domains: Option<&'static [&'static str]>,
}

impl HtmlSearch {
    pub fn justia(client: reqwest::Client) -> Result<Self, SourceError> {
        Ok(Self {
            name: "justia",
            weight: 0.8,
            client,
            search_url: Url::parse("https://law.justia.com/search")?,
            param: "query",
            selectors: ResultSelectors::parse(
                "div.search-result, div.result",
                "a.case-name, h3 a, a",
                "a.case-name, h3 a, a",
                ".snippet, .description, p",
            )?,
            allowed_domains: None,
        })
    }

    pub fn casemine(client: reqwest::Client) -> Result<Self, SourceError> {
        Ok(Self {
            name: "casemine",
            weight: 0.8,
            client,
            search_url: Url::parse("https://www.casemine.com/search/us")?,
            param: "q",
            selectors: ResultSelectors::parse(
                "div.search-result-item, li.result",
                "a.title, h3 a, a",
                "a.title, h3 a, a",
                ".description, .snippet, p",
            )?,
            allowed_domains: None,
        })
    }

    /// DuckDuckGo's HTML endpoint, keeping only authoritative hosts.
    pub fn web(client: reqwest::Client) -> Result<Self, SourceError> {
        Ok(Self {
            name: "web",
            weight: 0.7,
            client,
            search_url: Url::parse("https://html.duckduckgo.com/html/")?,
            param: "q",
            selectors: ResultSelectors::parse(
                "div.result",
                "a.result__a",
                "a.result__a",
                ".result__snippet",
            )?,
            allowed_domains: Some(AUTHORITATIVE_DOMAINS),
        })
    }

    fn query_text(query: &ClusterQuery) -> Option<String> {
        let citation = query.primary_citation()?;
        Some(match query.case_name.as_deref() {
            Some(name) => format!("\"{name}\" \"{citation}\""),
            None => format!("\"{citation}\""),
        })
    }

    /// Candidates from a results page. Hosts outside the allow-list, when one
    /// is set, are dropped.
    fn parse_results(&self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        for item in document.select(&self.selectors.item) {
            let Some(title) = first_text(&item, &self.selectors.title) else {
                continue;
            };
            let Some(href) = item
                .select(&self.selectors.link)
                .find_map(|a| a.value().attr("href"))
            else {
                continue;
            };
            let Some(url) = resolve_link(&self.search_url, href) else {
                continue;
            };
            if let Some(allowed) = self.allowed_domains
                && !is_allowed_host(&url, allowed)
            {
                debug!(source = self.name, url = %url, "skipping non-authoritative result");
                continue;
            }
            let Some(name) = clean_title(&title) else {
                continue;
            };
            let snippet = first_text(&item, &self.selectors.snippet).unwrap_or_default();

            let mut candidate = Candidate::new(name).with_jurisdiction(jurisdiction_from_url(&url));
            candidate.date = year_in(&title).or_else(|| year_in(&snippet));
            candidate.url = Some(url.into());
            candidates.push(candidate);
        }
        candidates
    }
}

#[async_trait]
impl Verifier for HtmlSearch {
    fn name(&self) -> &str {
        self.name
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    async fn lookup(&self, query: &ClusterQuery) -> Result<Vec<Candidate>, SourceError> {
        let Some(q) = Self::query_text(query) else {
            return Ok(Vec::new());
        };
        let resp = self
            .client
            .get(self.search_url.clone())
            .query(&[(self.param, q.as_str())])
            .send()
            .await?;
        let html = check_status(resp).await?.text().await?;
        let candidates = self.parse_results(&html);
        info!(source = self.name, count = candidates.len(), "scraped search results");
        Ok(candidates)
    }
}

fn first_text(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

/// Absolute result URL; DuckDuckGo redirect links are unwrapped.
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href).ok()?;
    if url.host_str().is_some_and(|h| h.ends_with("duckduckgo.com")) && url.path().starts_with("/l/") {
        let target = url.query_pairs().find(|(k, _)| k == "uddg").map(|(_, v)| v.into_owned())?;
        return Url::parse(&target).ok();
    }
    Some(url)
}

fn is_allowed_host(url: &Url, allowed: &[&str]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches("www.");
    allowed
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Court system from paths like `/cases/washington/supreme-court/1999/...`
/// and from court-run hosts.
fn jurisdiction_from_url(url: &Url) -> Jurisdiction {
    let host = url.host_str().unwrap_or_default();
    if host.ends_with("supremecourt.gov") {
        return Jurisdiction::Federal;
    }
    if host.ends_with("courts.wa.gov") {
        return Jurisdiction::State("wa".into());
    }
    let mut segments = url.path_segments().into_iter().flatten();
    if segments.next() == Some("cases")
        && let Some(system) = segments.next()
    {
        return Jurisdiction::from_court_text(&system.replace('-', " "));
    }
    Jurisdiction::Unknown
}

/// Case name from a result title: site suffixes and trailing citation text
/// removed. `None` when nothing name-like is left.
pub fn clean_title(title: &str) -> Option<String> {
    let segments: Vec<&str> = title
        .split(" | ")
        .flat_map(|s| s.split(" - "))
        .flat_map(|s| s.split(" \u{2014} "))
        .flat_map(|s| s.split(" :: "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let best = segments
        .iter()
        .find(|s| citecheck_core::names::has_case_connector(s))
        .or_else(|| segments.first())?;

    let mut name = TRAILING_CITATION.replace(best, "").into_owned();
    loop {
        let trimmed = TRAILING_PAREN.replace(&name, "").into_owned();
        if trimmed == name {
            break;
        }
        name = trimmed;
    }
    let name = name.trim().trim_end_matches([',', ';', ':']).trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn year_in(text: &str) -> Option<String> {
    PAREN_YEAR
        .captures(text)
        .or_else(|| ANY_YEAR.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
