//! Verification results and the per-source attempt log.

use chrono::{DateTime, NaiveDate};
use citecheck_core::CanonicalIdentity;
use serde::{Deserialize, Serialize};

use crate::query::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Verified,
    /// Every source was tried and none produced a validated match.
    Unverified,
    /// No usable case name, so no source was asked.
    SkippedNoName,
    Cancelled,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Unverified => "unverified",
            Self::SkippedNoName => "skipped_no_name",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One query to one source for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub source_name: String,
    pub matched: bool,
    pub candidate_identity: Option<CanonicalIdentity>,
    pub similarity_score: Option<f32>,
    pub error: Option<String>,
}

impl VerificationAttempt {
    pub(crate) fn matched(source: &str, identity: CanonicalIdentity, score: f32) -> Self {
        Self {
            source_name: source.to_string(),
            matched: true,
            candidate_identity: Some(identity),
            similarity_score: Some(score),
            error: None,
        }
    }

    pub(crate) fn rejected(source: &str, identity: Option<CanonicalIdentity>, score: Option<f32>, reason: String) -> Self {
        Self {
            source_name: source.to_string(),
            matched: false,
            candidate_identity: identity,
            similarity_score: score,
            error: Some(reason),
        }
    }

    pub(crate) fn failed(source: &str, error: String) -> Self {
        Self::rejected(source, None, None, error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: OutcomeStatus,
    pub canonical_name: Option<String>,
    pub canonical_date: Option<String>,
    pub canonical_url: Option<String>,
    pub source: Option<String>,
    pub confidence: Option<f32>,
    /// Why the cluster is not verified, for display.
    pub reason: Option<String>,
    pub attempts: Vec<VerificationAttempt>,
    /// Served from the verification cache.
    pub cached: bool,
}

impl VerificationOutcome {
    fn bare(status: OutcomeStatus, reason: Option<String>, attempts: Vec<VerificationAttempt>) -> Self {
        Self {
            status,
            canonical_name: None,
            canonical_date: None,
            canonical_url: None,
            source: None,
            confidence: None,
            reason,
            attempts,
            cached: false,
        }
    }

    pub(crate) fn accepted(identity: CanonicalIdentity, attempts: Vec<VerificationAttempt>) -> Self {
        Self {
            status: OutcomeStatus::Verified,
            canonical_name: Some(identity.name),
            canonical_date: identity.date,
            canonical_url: identity.url,
            source: Some(identity.source),
            confidence: Some(identity.confidence),
            reason: None,
            attempts,
            cached: false,
        }
    }

    pub(crate) fn unverified(reason: impl Into<String>, attempts: Vec<VerificationAttempt>) -> Self {
        Self::bare(OutcomeStatus::Unverified, Some(reason.into()), attempts)
    }

    pub(crate) fn skipped_no_name() -> Self {
        Self::bare(
            OutcomeStatus::SkippedNoName,
            Some("no usable case name in the document".into()),
            Vec::new(),
        )
    }

    pub(crate) fn cancelled() -> Self {
        Self::bare(OutcomeStatus::Cancelled, Some("cancelled".into()), Vec::new())
    }

    pub fn verified(&self) -> bool {
        self.status == OutcomeStatus::Verified
    }

    /// The identity to attach, present only when verified.
    pub fn identity(&self) -> Option<CanonicalIdentity> {
        if !self.verified() {
            return None;
        }
        Some(CanonicalIdentity {
            name: self.canonical_name.clone()?,
            date: self.canonical_date.clone(),
            url: self.canonical_url.clone(),
            source: self.source.clone().unwrap_or_default(),
            confidence: self.confidence.unwrap_or_default(),
        })
    }
}

/// Identity for a candidate from `source`, with its date normalized.
pub(crate) fn identity_for(candidate: &Candidate, source: &str, confidence: f32) -> CanonicalIdentity {
    CanonicalIdentity {
        name: candidate.name.clone(),
        date: candidate.date.as_deref().and_then(normalize_date),
        url: candidate.url.clone(),
        source: source.to_string(),
        confidence,
    }
}

/// `YYYY-MM-DD` when a full date is present, otherwise the four-digit year.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    for format in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    if let Some(prefix) = raw.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    raw.as_bytes()
        .windows(4)
        .enumerate()
        .find(|(i, w)| {
            w.iter().all(u8::is_ascii_digit)
                && !raw.as_bytes().get(i + 4).is_some_and(u8::is_ascii_digit)
                && (*i == 0 || !raw.as_bytes()[i - 1].is_ascii_digit())
        })
        .map(|(i, _)| raw[i..i + 4].to_string())
}
