//! `eval`: extraction accuracy against a labelled corpus, no network.

use std::path::Path;

use anyhow::Context;
use citecheck_core::Config;
use citecheck_pipeline::Pipeline;
use citecheck_pipeline::eval::{EvalReport, evaluate, parse_labels};

pub fn run_eval(config: &Config, labels: &Path) -> anyhow::Result<EvalReport> {
    let json = std::fs::read_to_string(labels).with_context(|| format!("reading {}", labels.display()))?;
    let documents = parse_labels(&json).with_context(|| format!("parsing labels in {}", labels.display()))?;
    eprintln!("  Read {} labelled documents from {}", documents.len(), labels.display());
    Ok(evaluate(&Pipeline::offline(config), &documents))
}

pub fn print_report(report: &EvalReport) {
    for doc in &report.documents {
        println!(
            "  {:<40} {:>3}/{:<3} found  {:>6.1}%",
            doc.name,
            doc.found,
            doc.labeled,
            doc.accuracy() * 100.0
        );
        for m in &doc.mismatches {
            println!(
                "      {:<24} {:<10} expected {:<30} found {}",
                m.citation,
                m.field,
                m.expected.as_deref().unwrap_or("-"),
                m.found.as_deref().unwrap_or("-")
            );
        }
    }
    println!();
    println!("  {:<26} {:.1}%", "accuracy", report.accuracy() * 100.0);
    println!("  {:<26} {}", "conflicting clusters", report.conflicting_clusters());
}
