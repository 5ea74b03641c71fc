//! Clustering engine: groups citations that denote one decision.
//!
//! Two citations are linked when
//! - the extractor flagged them as adjacent parallel citations,
//! - one is a short form, "Id." or "supra" pointing at the other,
//! - they are the same full citation repeated, or
//! - they carry the same case name and year read from the text, and the name
//!   has enough distinctive tokens not to be a coincidence ("State v. Smith"
//!   does not qualify).
//!
//! Linking is transitive. Only values read from the text feed the links, so
//! running [`cluster`] again over its own output reproduces the same
//! partition.

mod union_find;

use std::collections::{BTreeMap, HashMap};

use citecheck_core::names;
use citecheck_core::{Citation, CitationId, Cluster, ClusterConfig, ClusterId};
use tracing::{debug, info};

use union_find::UnionFind;

/// Partition `citations` into clusters and propagate names and years.
///
/// Every citation lands in exactly one cluster and gets its `cluster_id`.
/// Clusters are numbered in order of their first member.
pub fn cluster(citations: &mut [Citation], config: &ClusterConfig) -> Vec<Cluster> {
    let mut uf = UnionFind::new(citations.len());
    let index_of: HashMap<_, _> = citations.iter().enumerate().map(|(i, c)| (c.id, i)).collect();

    let mut by_text: HashMap<&str, usize> = HashMap::new();
    let mut by_name_year: BTreeMap<(String, &str), usize> = BTreeMap::new();

    for (i, citation) in citations.iter().enumerate() {
        if citation.parallel_with_previous && i > 0 {
            uf.union(i - 1, i);
        }
        if let Some(target) = citation.antecedent.and_then(|id| index_of.get(&id)) {
            uf.union(i, *target);
        }
        if citation.kind.is_verifiable() {
            match by_text.get(citation.normalized_text.as_str()) {
                Some(first) => uf.union(*first, i),
                None => {
                    by_text.insert(&citation.normalized_text, i);
                }
            }
        }
        if let (Some(name), Some(year)) = (citation.textual_case_name(), citation.textual_year()) {
            let tokens = names::distinctive_tokens(name);
            if tokens.len() >= config.min_distinctive_tokens {
                let key = (tokens.into_iter().collect::<Vec<_>>().join(" "), year);
                match by_name_year.get(&key) {
                    Some(first) => uf.union(*first, i),
                    None => {
                        by_name_year.insert(key, i);
                    }
                }
            }
        }
    }

    let mut clusters: Vec<Cluster> = uf
        .groups()
        .into_iter()
        .enumerate()
        .map(|(n, members)| {
            let id = ClusterId(n);
            for &i in &members {
                citations[i].cluster_id = Some(id);
            }
            Cluster::new(id, members.iter().map(|&i| citations[i].id).collect())
        })
        .collect();

    for cluster in &mut clusters {
        propagate(citations, &index_of, cluster);
    }

    info!(
        citations = citations.len(),
        clusters = clusters.len(),
        "clustered citations"
    );
    clusters
}

/// Most frequent value, earliest on ties.
fn consensus<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts
        .into_iter()
        .find(|(_, n)| *n == best)
        .map(|(v, _)| v.to_string())
}

/// Copy the cluster's name and year onto members that lack a textual one.
fn propagate(
    citations: &mut [Citation],
    index_of: &HashMap<CitationId, usize>,
    cluster: &mut Cluster,
) {
    let members: Vec<usize> = cluster
        .member_citation_ids
        .iter()
        .filter_map(|id| index_of.get(id).copied())
        .collect();

    let name = consensus(members.iter().filter_map(|&i| citations[i].textual_case_name()));
    let year = consensus(members.iter().filter_map(|&i| citations[i].textual_year()));

    for &i in &members {
        let citation = &mut citations[i];
        if let Some(name) = &name
            && (citation.extracted_case_name.is_none() || citation.name_propagated)
        {
            citation.extracted_case_name = Some(name.clone());
            citation.name_propagated = true;
        }
        if let Some(year) = &year
            && (citation.extracted_year.is_none() || citation.year_propagated)
        {
            citation.extracted_year = Some(year.clone());
            citation.year_propagated = true;
        }
    }
    if members.len() > 1 {
        debug!(
            cluster = cluster.id.0,
            members = members.len(),
            name = name.as_deref().unwrap_or("-"),
            "propagated cluster name"
        );
    }
    cluster.case_name = name;
    cluster.year = year;
}

/// Second pass after verification: copy each verified cluster's canonical
/// identity onto every member. Returns how many citations changed.
pub fn propagate_canonical(citations: &mut [Citation], clusters: &[Cluster]) -> usize {
    let index_of: HashMap<_, _> = citations.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
    let mut applied = 0;
    for cluster in clusters {
        let Some(identity) = cluster.canonical_identity.as_ref().filter(|_| cluster.verified) else {
            continue;
        };
        for id in &cluster.member_citation_ids {
            if let Some(&i) = index_of.get(id)
                && citations[i].apply_identity(identity)
            {
                applied += 1;
            }
        }
    }
    debug!(applied, "propagated canonical identities");
    applied
}

/// Whether any cluster's members disagree on their canonical name.
pub fn has_conflicting_identity(citations: &[Citation], cluster: &Cluster) -> bool {
    let mut names = cluster
        .member_citation_ids
        .iter()
        .filter_map(|id| citations.iter().find(|c| c.id == *id))
        .filter_map(Citation::canonical_name);
    match names.next() {
        Some(first) => names.any(|n| n != first),
        None => false,
    }
}
