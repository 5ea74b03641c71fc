//! Citation records produced by extraction and annotated by verification.

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;

/// Index of a citation in its [`ProcessResult`](crate::ProcessResult) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationId(pub usize);

/// Half-open character range `[start, end)` in the source document.
///
/// Offsets are byte offsets into the UTF-8 document text, so they can be used
/// directly to slice the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Syntactic form of a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    /// `volume reporter page`, e.g. "123 Wn.2d 45".
    Full,
    /// `volume reporter at pin`, e.g. "123 Wn.2d at 47".
    Short,
    /// "Id." / "Ibid.", optionally with a pin cite.
    Id,
    /// "Doe, supra, at 47".
    Supra,
    /// Vendor, public-domain, or international form, e.g. "2019 WL 1234567".
    Neutral,
}

impl CitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Short => "short",
            Self::Id => "id",
            Self::Supra => "supra",
            Self::Neutral => "neutral",
        }
    }

    /// Whether the citation names a decision on its own and can be sent to a
    /// verification source.
    pub fn is_verifiable(&self) -> bool {
        matches!(self, Self::Full | Self::Neutral)
    }
}

/// Authoritative identity of a decision as confirmed by a verification source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub name: String,
    /// `YYYY-MM-DD` when the source reports a full date, otherwise a year.
    pub date: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub confidence: f32,
}

/// One recognized citation string.
///
/// Serializes to a flat record. `verified` and the `canonical_*` fields are
/// private and can only be written through [`Citation::apply_identity`],
/// which writes all of them at once and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: CitationId,
    pub kind: CitationKind,
    pub raw_text: String,
    pub normalized_text: String,
    pub position: Span,
    pub volume: Option<String>,
    pub reporter: Option<String>,
    pub page: Option<String>,
    pub pin_cite: Option<String>,
    /// Court abbreviation read from the trailing parenthetical ("9th Cir.").
    pub court_hint: Option<String>,
    pub extracted_case_name: Option<String>,
    pub extracted_year: Option<String>,
    /// The case name was copied from another cluster member.
    pub name_propagated: bool,
    /// The year was copied from another cluster member.
    pub year_propagated: bool,
    /// Separated from the previous citation only by commas/semicolons.
    pub parallel_with_previous: bool,
    /// Citation this short form, "Id." or "supra" refers back to.
    pub antecedent: Option<CitationId>,
    pub cluster_id: Option<ClusterId>,
    verified: bool,
    canonical_name: Option<String>,
    canonical_date: Option<String>,
    canonical_url: Option<String>,
    verification_source: Option<String>,
    confidence: Option<f32>,
}

impl Citation {
    pub fn new(
        id: CitationId,
        kind: CitationKind,
        raw_text: impl Into<String>,
        normalized_text: impl Into<String>,
        position: Span,
    ) -> Self {
        Self {
            id,
            kind,
            raw_text: raw_text.into(),
            normalized_text: normalized_text.into(),
            position,
            volume: None,
            reporter: None,
            page: None,
            pin_cite: None,
            court_hint: None,
            extracted_case_name: None,
            extracted_year: None,
            name_propagated: false,
            year_propagated: false,
            parallel_with_previous: false,
            antecedent: None,
            cluster_id: None,
            verified: false,
            canonical_name: None,
            canonical_date: None,
            canonical_url: None,
            verification_source: None,
            confidence: None,
        }
    }

    /// Case name read directly from the document text, ignoring propagated values.
    pub fn textual_case_name(&self) -> Option<&str> {
        if self.name_propagated {
            None
        } else {
            self.extracted_case_name.as_deref()
        }
    }

    /// Year read directly from the document text, ignoring propagated values.
    pub fn textual_year(&self) -> Option<&str> {
        if self.year_propagated {
            None
        } else {
            self.extracted_year.as_deref()
        }
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }

    pub fn canonical_date(&self) -> Option<&str> {
        self.canonical_date.as_deref()
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.canonical_url.as_deref()
    }

    pub fn verification_source(&self) -> Option<&str> {
        self.verification_source.as_deref()
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    /// The canonical identity currently attached, if any.
    pub fn canonical_identity(&self) -> Option<CanonicalIdentity> {
        let name = self.canonical_name.clone()?;
        Some(CanonicalIdentity {
            name,
            date: self.canonical_date.clone(),
            url: self.canonical_url.clone(),
            source: self.verification_source.clone().unwrap_or_default(),
            confidence: self.confidence.unwrap_or_default(),
        })
    }

    /// Attach a verified identity, writing every canonical field together.
    ///
    /// Refused (returns `false`) once any identity is attached, whatever its
    /// confidence.
    pub fn apply_identity(&mut self, identity: &CanonicalIdentity) -> bool {
        if self.verified {
            return false;
        }
        self.canonical_name = Some(identity.name.clone());
        self.canonical_date = identity.date.clone();
        self.canonical_url = identity.url.clone();
        self.verification_source = Some(identity.source.clone());
        self.confidence = Some(identity.confidence);
        self.verified = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, confidence: f32) -> CanonicalIdentity {
        CanonicalIdentity {
            name: name.into(),
            date: Some("1999-05-01".into()),
            url: Some("https://www.courtlistener.com/opinion/1/doe-v-roe/".into()),
            source: "courtlistener-lookup".into(),
            confidence,
        }
    }

    fn citation() -> Citation {
        Citation::new(
            CitationId(0),
            CitationKind::Full,
            "123 Wn.2d 45",
            "123 Wn.2d 45",
            Span::new(12, 24),
        )
    }

    #[test]
    fn new_citation_is_unverified() {
        let c = citation();
        assert!(!c.verified());
        assert!(c.canonical_identity().is_none());
        assert!(c.canonical_name().is_none());
    }

    #[test]
    fn apply_identity_sets_all_fields() {
        let mut c = citation();
        assert!(c.apply_identity(&identity("Doe v. Roe", 0.9)));
        assert!(c.verified());
        assert_eq!(c.canonical_name(), Some("Doe v. Roe"));
        assert_eq!(c.canonical_date(), Some("1999-05-01"));
        assert_eq!(c.verification_source(), Some("courtlistener-lookup"));
        assert_eq!(c.confidence(), Some(0.9));
    }

    #[test]
    fn identity_written_once() {
        let mut c = citation();
        assert!(c.apply_identity(&identity("Doe v. Roe", 0.6)));
        assert!(!c.apply_identity(&identity("Roe v. Doe", 0.5)));
        assert!(!c.apply_identity(&identity("Roe v. Doe", 0.6)));
        assert!(!c.apply_identity(&identity("Roe v. Doe", 0.99)));
        assert_eq!(c.canonical_name(), Some("Doe v. Roe"));
        assert_eq!(c.confidence(), Some(0.6));
    }

    #[test]
    fn textual_values_hide_propagated_ones() {
        let mut c = citation();
        c.extracted_case_name = Some("Doe v. Roe".into());
        c.name_propagated = true;
        c.extracted_year = Some("1999".into());
        assert_eq!(c.textual_case_name(), None);
        assert_eq!(c.textual_year(), Some("1999"));
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(0, 10);
        assert!(a.overlaps(&Span::new(9, 12)));
        assert!(!a.overlaps(&Span::new(10, 12)));
        assert!(a.contains(&Span::new(2, 5)));
    }

    #[test]
    fn flat_record_field_names() {
        let mut c = citation();
        c.apply_identity(&identity("Doe v. Roe", 0.9));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["canonical_name"], "Doe v. Roe");
        assert_eq!(json["verification_source"], "courtlistener-lookup");
        assert_eq!(json["position"]["start"], 12);
        assert_eq!(json["kind"], "full");
        assert!(json["cluster_id"].is_null());
        assert_eq!(json["verified"], true);
    }
}
