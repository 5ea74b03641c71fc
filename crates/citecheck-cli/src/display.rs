//! Vertical card display for processed documents.
//!
//! One card per cluster: what was read from the text, what a source
//! confirmed (or why nothing was), then the member citations.

use citecheck_core::{Citation, Cluster, ProcessResult};

const MAX_MEMBERS: usize = 10;

// ── Public API ──

/// Print every cluster of a verified document as a card.
pub fn print_report(result: &ProcessResult) {
    for cluster in &result.clusters {
        print_cluster_card(result, cluster);
    }
}

/// Print the citations and clusters of an unverified document.
pub fn print_citations(result: &ProcessResult) {
    println!("=== {} citations, {} clusters ===", result.citations.len(), result.clusters.len());
    println!();
    for citation in &result.citations {
        let cluster = citation.cluster_id.map(|id| id.0 + 1).unwrap_or_default();
        print!("  {:<26} {:<8} #{:<3}", citation.raw_text, citation.kind.as_str(), cluster);
        if let Some(name) = &citation.extracted_case_name {
            print!("  {name}");
        }
        if let Some(year) = &citation.extracted_year {
            print!(" ({year})");
        }
        println!();
    }
}

pub fn print_cluster_card(result: &ProcessResult, cluster: &Cluster) {
    let title = cluster.case_name.as_deref().unwrap_or("(no case name)");
    match &cluster.year {
        Some(year) => println!("=== {}. {} ({}) ===", cluster.id.0 + 1, title, year),
        None => println!("=== {}. {} ===", cluster.id.0 + 1, title),
    }
    if cluster.verified {
        println!("VERIFIED");
    } else {
        println!(
            "UNVERIFIED: {}",
            cluster.unverified_reason.as_deref().unwrap_or("not checked")
        );
    }
    println!();

    print_section(
        "Extracted",
        &[
            ("case_name", cluster.case_name.clone()),
            ("year", cluster.year.clone()),
        ],
    );

    if let Some(identity) = cluster.canonical_identity.as_ref().filter(|_| cluster.verified) {
        print_section(
            "Canonical",
            &[
                ("name", Some(identity.name.clone())),
                ("date", identity.date.clone()),
                ("url", identity.url.clone()),
                ("source", Some(identity.source.clone())),
                ("confidence", Some(format!("{:.2}", identity.confidence))),
            ],
        );
    }

    let members: Vec<&Citation> = result.members(cluster).collect();
    println!("Members ({}):", members.len());
    for citation in members.iter().take(MAX_MEMBERS) {
        print!("    {:<30} {:<8}", citation.raw_text, citation.kind.as_str());
        if citation.name_propagated || citation.year_propagated {
            print!("  (name/year from cluster)");
        }
        println!();
    }
    if members.len() > MAX_MEMBERS {
        println!("    ... and {} more", members.len() - MAX_MEMBERS);
    }
    println!();
}

// ── Section rendering ──

fn print_section(header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, value)| value.is_none()) {
        return;
    }
    println!("{header}");
    for (label, value) in rows {
        if let Some(value) = value {
            println!("  {:<26} {}", label, value);
        }
    }
    println!();
}
