//! Name/year accuracy against a hand-labelled corpus.
//!
//! Labels are JSON: `[{"text": ..., "citations": [{"citation", "case_name", "year"}]}]`.
//! Each labelled citation is matched to the next unused extracted citation
//! with the same text, and its post-clustering name and year are compared.

use citecheck_cluster::has_conflicting_identity;
use citecheck_core::{Citation, ProcessResult, reporter};
use serde::{Deserialize, Serialize};

use crate::orchestrator::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub text: String,
    pub citations: Vec<LabeledCitation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledCitation {
    pub citation: String,
    pub case_name: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub citation: String,
    pub field: &'static str,
    pub expected: Option<String>,
    pub found: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentScore {
    pub name: String,
    pub labeled: usize,
    /// Labelled citations the extractor found at all.
    pub found: usize,
    /// Name and year fields that agree with the label.
    pub correct: usize,
    pub fields: usize,
    pub conflicting_clusters: usize,
    pub mismatches: Vec<Mismatch>,
}

impl DocumentScore {
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.fields)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalReport {
    pub documents: Vec<DocumentScore>,
}

impl EvalReport {
    /// Correct fields over all fields, across every document.
    pub fn accuracy(&self) -> f64 {
        let correct: usize = self.documents.iter().map(|d| d.correct).sum();
        let fields: usize = self.documents.iter().map(|d| d.fields).sum();
        ratio(correct, fields)
    }

    pub fn conflicting_clusters(&self) -> usize {
        self.documents.iter().map(|d| d.conflicting_clusters).sum()
    }
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 { 1.0 } else { n as f64 / d as f64 }
}

pub fn parse_labels(json: &str) -> serde_json::Result<Vec<LabeledDocument>> {
    serde_json::from_str(json)
}

/// Extract and cluster every document (no verification) and score it.
pub fn evaluate(pipeline: &Pipeline, documents: &[LabeledDocument]) -> EvalReport {
    let documents = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let result = pipeline.extract_and_cluster(&doc.text);
            let name = doc.name.clone().unwrap_or_else(|| format!("document {}", i + 1));
            score_document(name, doc, &result)
        })
        .collect();
    EvalReport { documents }
}

pub fn score_document(name: String, doc: &LabeledDocument, result: &ProcessResult) -> DocumentScore {
    let mut used = vec![false; result.citations.len()];
    let mut score = DocumentScore {
        name,
        labeled: doc.citations.len(),
        found: 0,
        correct: 0,
        fields: doc.citations.len() * 2,
        conflicting_clusters: result
            .clusters
            .iter()
            .filter(|c| has_conflicting_identity(&result.citations, c))
            .count(),
        mismatches: Vec::new(),
    };

    for label in &doc.citations {
        let key = reporter::compact(&label.citation);
        let matched = result
            .citations
            .iter()
            .position(|c| !used[c.id.0] && citation_matches(c, &key));
        let Some(i) = matched else {
            score.mismatches.push(Mismatch {
                citation: label.citation.clone(),
                field: "citation",
                expected: Some(label.citation.clone()),
                found: None,
            });
            continue;
        };
        used[i] = true;
        score.found += 1;
        let citation = &result.citations[i];

        let checks: [(&'static str, &Option<String>, Option<&str>, fn(&str, &str) -> bool); 2] = [
            ("case_name", &label.case_name, citation.extracted_case_name.as_deref(), same_name),
            ("year", &label.year, citation.extracted_year.as_deref(), same_year),
        ];
        for (field, expected, found, same) in checks {
            let agrees = match (expected.as_deref(), found) {
                (Some(e), Some(f)) => same(e, f),
                (None, None) => true,
                _ => false,
            };
            if agrees {
                score.correct += 1;
            } else {
                score.mismatches.push(Mismatch {
                    citation: label.citation.clone(),
                    field,
                    expected: expected.clone(),
                    found: found.map(str::to_string),
                });
            }
        }
    }
    score
}

fn same_year(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

fn citation_matches(citation: &Citation, key: &str) -> bool {
    reporter::compact(&citation.normalized_text) == key || reporter::compact(&citation.raw_text) == key
}

/// Case-insensitive, whitespace-collapsed, trailing punctuation ignored.
fn same_name(a: &str, b: &str) -> bool {
    fn norm(s: &str) -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end_matches([',', ';'])
            .to_lowercase()
    }
    norm(a) == norm(b)
}
