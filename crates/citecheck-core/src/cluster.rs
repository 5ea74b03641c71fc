//! Clusters of citations that denote one judicial decision.

use serde::{Deserialize, Serialize};

use crate::citation::{CanonicalIdentity, Citation, CitationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

/// A set of citations believed to denote one decision.
///
/// Owns citation ids, not citations: the citations themselves live in the
/// [`ProcessResult`] arena and point back with a plain `cluster_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub member_citation_ids: Vec<CitationId>,
    /// Case name shared by the members after propagation.
    pub case_name: Option<String>,
    pub year: Option<String>,
    pub canonical_identity: Option<CanonicalIdentity>,
    pub verified: bool,
    /// Why verification did not succeed, for display next to "unverified".
    pub unverified_reason: Option<String>,
}

impl Cluster {
    pub fn new(id: ClusterId, member_citation_ids: Vec<CitationId>) -> Self {
        Self {
            id,
            member_citation_ids,
            case_name: None,
            year: None,
            canonical_identity: None,
            verified: false,
            unverified_reason: None,
        }
    }

    pub fn len(&self) -> usize {
        self.member_citation_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_citation_ids.is_empty()
    }

    pub fn set_identity(&mut self, identity: CanonicalIdentity) {
        self.canonical_identity = Some(identity);
        self.verified = true;
        self.unverified_reason = None;
    }

    pub fn mark_unverified(&mut self, reason: impl Into<String>) {
        self.canonical_identity = None;
        self.verified = false;
        self.unverified_reason = Some(reason.into());
    }
}

/// Output of one processing pass: the citation arena and its partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub citations: Vec<Citation>,
    pub clusters: Vec<Cluster>,
}

impl ProcessResult {
    pub fn new(citations: Vec<Citation>, clusters: Vec<Cluster>) -> Self {
        Self {
            citations,
            clusters,
        }
    }

    pub fn citation(&self, id: CitationId) -> Option<&Citation> {
        self.citations.get(id.0)
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.0)
    }

    /// Member citations of a cluster, in document order.
    pub fn members<'a>(&'a self, cluster: &'a Cluster) -> impl Iterator<Item = &'a Citation> {
        cluster
            .member_citation_ids
            .iter()
            .filter_map(|id| self.citation(*id))
    }

    pub fn verified_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.verified).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{CitationKind, Span};

    #[test]
    fn members_resolve_through_arena() {
        let citations = vec![
            Citation::new(CitationId(0), CitationKind::Full, "1 U.S. 1", "1 U.S. 1", Span::new(0, 8)),
            Citation::new(CitationId(1), CitationKind::Full, "2 U.S. 2", "2 U.S. 2", Span::new(10, 18)),
        ];
        let cluster = Cluster::new(ClusterId(0), vec![CitationId(1)]);
        let result = ProcessResult::new(citations, vec![cluster]);
        let members: Vec<_> = result.members(&result.clusters[0]).collect();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].raw_text, "2 U.S. 2");
    }

    #[test]
    fn mark_unverified_clears_identity() {
        let mut cluster = Cluster::new(ClusterId(0), vec![CitationId(0)]);
        cluster.set_identity(CanonicalIdentity {
            name: "Doe v. Roe".into(),
            date: None,
            url: None,
            source: "test".into(),
            confidence: 0.9,
        });
        assert!(cluster.verified);
        cluster.mark_unverified("no source returned a matching case");
        assert!(!cluster.verified);
        assert!(cluster.canonical_identity.is_none());
    }
}
