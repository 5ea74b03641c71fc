//! What a source is asked, and what it answers.

use citecheck_core::jurisdiction::Jurisdiction;
use citecheck_core::{Citation, Cluster, reporter};
use serde::{Deserialize, Serialize};

/// One cluster, reduced to what external sources need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterQuery {
    /// Normalized text of the cluster's full and neutral members, in
    /// document order. The first is the cache key.
    pub citations: Vec<String>,
    pub case_name: Option<String>,
    pub year: Option<String>,
    /// Jurisdiction implied by the members' reporters, then court hints.
    pub jurisdiction: Jurisdiction,
}

impl ClusterQuery {
    pub fn new(citation: impl Into<String>, case_name: Option<&str>, year: Option<&str>) -> Self {
        let citations = vec![citation.into()];
        let jurisdiction = expected_jurisdiction(citations.iter().map(String::as_str), None::<&str>);
        Self {
            citations,
            case_name: case_name.map(str::to_string),
            year: year.map(str::to_string),
            jurisdiction,
        }
    }

    /// Build from a cluster whose members live in `citations` (the arena).
    pub fn from_cluster(citations: &[Citation], cluster: &Cluster) -> Self {
        let members: Vec<&Citation> = cluster
            .member_citation_ids
            .iter()
            .filter_map(|id| citations.get(id.0).filter(|c| c.id == *id))
            .collect();

        let mut texts: Vec<String> = Vec::new();
        for c in members.iter().filter(|c| c.kind.is_verifiable()) {
            if !texts.contains(&c.normalized_text) {
                texts.push(c.normalized_text.clone());
            }
        }

        let reporters = members
            .iter()
            .filter(|c| c.kind.is_verifiable())
            .filter_map(|c| c.reporter.as_deref());
        let hints = members.iter().filter_map(|c| c.court_hint.as_deref());

        Self {
            jurisdiction: expected_jurisdiction(reporters, hints),
            citations: texts,
            case_name: cluster
                .case_name
                .clone()
                .or_else(|| members.iter().find_map(|c| c.extracted_case_name.clone())),
            year: cluster
                .year
                .clone()
                .or_else(|| members.iter().find_map(|c| c.extracted_year.clone())),
        }
    }

    pub fn primary_citation(&self) -> Option<&str> {
        self.citations.first().map(String::as_str)
    }

    /// Nothing a source could look up: only Id./supra/short members.
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

/// First specific jurisdiction among reporters (by table lookup, or raw
/// citation text), then court hints.
fn expected_jurisdiction<'a>(
    reporters: impl Iterator<Item = &'a str>,
    hints: impl IntoIterator<Item = &'a str>,
) -> Jurisdiction {
    let from_reporters = reporters.filter_map(|r| {
        reporter::lookup(r).map(|spec| spec.jurisdiction()).or_else(|| {
            // A full normalized citation: "123 Wn.2d 45".
            let mut words = r.split_whitespace();
            words.next()?;
            let rest: Vec<&str> = words.collect();
            let middle = rest.get(..rest.len().checked_sub(1)?)?;
            reporter::match_tokens(middle).map(|(spec, _)| spec.jurisdiction())
        })
    });
    let from_hints = hints.into_iter().map(Jurisdiction::from_court_text);
    from_reporters
        .chain(from_hints)
        .find(Jurisdiction::is_specific)
        .unwrap_or_default()
}

/// One decision a source offered for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub date: Option<String>,
    pub url: Option<String>,
    pub court: Option<String>,
    pub jurisdiction: Jurisdiction,
}

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: None,
            url: None,
            court: None,
            jurisdiction: Jurisdiction::Unknown,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }

    /// Set the court text and infer the jurisdiction from it when unset.
    pub fn with_court(mut self, court: impl Into<String>) -> Self {
        let court = court.into();
        if self.jurisdiction == Jurisdiction::Unknown {
            self.jurisdiction = Jurisdiction::from_court_text(&court);
        }
        self.court = Some(court);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citecheck_core::ClusterConfig;

    #[test]
    fn query_from_parallel_cluster() {
        let mut citations = citecheck_extract::extract("Doe v. Roe, 123 Wn.2d 45, 456 P.3d 78 (1999). Id. at 47.");
        let clusters = citecheck_cluster::cluster(&mut citations, &ClusterConfig::default());
        let query = ClusterQuery::from_cluster(&citations, &clusters[0]);
        assert_eq!(query.citations, vec!["123 Wn.2d 45", "456 P.3d 78"]);
        assert_eq!(query.case_name.as_deref(), Some("Doe v. Roe"));
        assert_eq!(query.year.as_deref(), Some("1999"));
        assert_eq!(query.jurisdiction, Jurisdiction::State("wa".into()));
    }

    #[test]
    fn regional_reporter_falls_back_to_court_hint() {
        let mut citations = citecheck_extract::extract("Doe v. Roe, 456 P.3d 78 (Or. Ct. App. 2004).");
        let clusters = citecheck_cluster::cluster(&mut citations, &ClusterConfig::default());
        let query = ClusterQuery::from_cluster(&citations, &clusters[0]);
        assert_eq!(query.jurisdiction, Jurisdiction::State("or".into()));
    }

    #[test]
    fn jurisdiction_from_bare_citation_text() {
        assert_eq!(
            ClusterQuery::new("347 U.S. 483", Some("Brown v. Board"), None).jurisdiction,
            Jurisdiction::Federal
        );
        // Regional reporters imply no single state.
        assert_eq!(ClusterQuery::new("5 P.3d 9", None, None).jurisdiction, Jurisdiction::Unknown);
    }

    #[test]
    fn candidate_court_sets_jurisdiction() {
        let candidate = Candidate::new("Doe v. Roe").with_court("Supreme Court of Washington");
        assert_eq!(candidate.jurisdiction, Jurisdiction::State("wa".into()));
    }
}
