//! Extraction engine: document text → ordered citations.
//!
//! Extraction runs in three explicit stages, each usable on its own so the
//! orchestrator can report progress between them:
//!
//! 1. [`Extractor::recognize`] runs the reporter tokenizer and the
//!    supplementary patterns, drops statutory spans, merges and de-duplicates.
//! 2. [`Extractor::analyze`] reads adjacent year parentheticals, flags
//!    parallel citations, and links "Id." and short forms to their antecedents.
//! 3. [`Extractor::attach_names`] reads case names and resolves "supra".
//!
//! Extraction never fails: text it cannot read yields fewer citations or
//! citations with absent name and year.

pub mod case_name;
mod patterns;
mod tokenizer;

use citecheck_core::{Citation, CitationId, CitationKind, ExtractConfig, Span};
use tracing::debug;

/// A recognized candidate before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCitation {
    pub kind: CitationKind,
    pub start: usize,
    pub end: usize,
    pub raw_text: String,
    pub normalized_text: String,
    pub volume: Option<String>,
    pub reporter: Option<String>,
    pub page: Option<String>,
    pub pin_cite: Option<String>,
}

impl RawCitation {
    fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractConfig,
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// All three stages.
    pub fn extract(&self, text: &str) -> Vec<Citation> {
        let mut citations = self.recognize(text);
        self.analyze(text, &mut citations);
        self.attach_names(text, &mut citations);
        citations
    }

    /// Stage 1: recognize, filter statutes, merge, order and number.
    pub fn recognize(&self, text: &str) -> Vec<Citation> {
        let from_tokens = tokenizer::recognize(text);
        let from_patterns = patterns::recognize(text);
        let statutes = patterns::statute_spans(text);
        debug!(
            tokenizer = from_tokens.len(),
            patterns = from_patterns.len(),
            statutes = statutes.len(),
            "recognized candidates"
        );

        let candidates = drop_statutory(
            from_tokens.into_iter().chain(from_patterns).collect(),
            &statutes,
        );
        merge(candidates)
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut citation = Citation::new(
                    CitationId(i),
                    raw.kind,
                    raw.raw_text,
                    raw.normalized_text,
                    Span::new(raw.start, raw.end),
                );
                citation.volume = raw.volume;
                citation.reporter = raw.reporter;
                citation.page = raw.page;
                citation.pin_cite = raw.pin_cite;
                citation
            })
            .collect()
    }

    /// Stage 2: years, court hints, parallel flags, Id./short-form antecedents.
    pub fn analyze(&self, text: &str, citations: &mut [Citation]) {
        for citation in citations.iter_mut() {
            if matches!(citation.kind, CitationKind::Id | CitationKind::Supra) {
                continue;
            }
            let after = &text[citation.position.end..];
            if let Some((year, court)) = case_name::parenthetical_after(after, self.config.year_window) {
                citation.extracted_year = Some(year);
                citation.court_hint = court;
            } else if citation.kind == CitationKind::Neutral
                && let Some(volume) = citation.volume.as_deref()
                && is_year(volume)
            {
                // Public-domain citations carry their year as the volume.
                citation.extracted_year = Some(volume.to_string());
            }
        }

        for i in 1..citations.len() {
            let (before, rest) = citations.split_at_mut(i);
            let current = &mut rest[0];
            let previous = &before[i - 1];

            current.parallel_with_previous = previous.kind.is_verifiable()
                && current.kind.is_verifiable()
                && is_parallel_gap(
                    &text[previous.position.end..current.position.start],
                    self.config.parallel_window,
                );

            current.antecedent = match current.kind {
                CitationKind::Id => Some(previous.id),
                CitationKind::Short => before
                    .iter()
                    .rev()
                    .find(|c| {
                        c.kind == CitationKind::Full
                            && c.volume == current.volume
                            && c.reporter == current.reporter
                    })
                    .map(|c| c.id),
                _ => None,
            };
        }
        debug!(
            parallel = citations.iter().filter(|c| c.parallel_with_previous).count(),
            linked = citations.iter().filter(|c| c.antecedent.is_some()).count(),
            "analyzed citations"
        );
    }

    /// Stage 3: case names for full citations, then supra antecedents.
    pub fn attach_names(&self, text: &str, citations: &mut [Citation]) {
        let mut floor = 0;
        for citation in citations.iter_mut() {
            if citation.kind.is_verifiable() {
                citation.extracted_case_name = case_name::extract_case_name(
                    text,
                    floor,
                    citation.position.start,
                    self.config.name_window,
                    self.config.wide_name_window,
                    self.config.min_name_len,
                );
            }
            floor = citation.position.end;
        }

        for i in 0..citations.len() {
            if citations[i].kind != CitationKind::Supra {
                continue;
            }
            let Some(party) = citations[i].reporter.clone() else {
                continue;
            };
            citations[i].antecedent = citations[..i]
                .iter()
                .rev()
                .find(|c| {
                    c.kind.is_verifiable()
                        && c.extracted_case_name
                            .as_deref()
                            .is_some_and(|name| name_mentions(name, &party))
                })
                .map(|c| c.id);
        }
        debug!(
            named = citations.iter().filter(|c| c.extracted_case_name.is_some()).count(),
            total = citations.len(),
            "attached case names"
        );
    }
}

/// Extract with the default configuration.
pub fn extract(text: &str) -> Vec<Citation> {
    Extractor::default().extract(text)
}

fn drop_statutory(candidates: Vec<RawCitation>, statutes: &[Span]) -> Vec<RawCitation> {
    candidates
        .into_iter()
        .filter(|c| {
            let span = c.span();
            !statutes.iter().any(|s| s.overlaps(&span))
        })
        .collect()
}

/// Resolve overlapping candidates: the earlier, then longer one wins; on an
/// exact tie the tokenizer's reading (listed first) wins.
fn merge(candidates: Vec<RawCitation>) -> Vec<RawCitation> {
    let mut indexed: Vec<(usize, RawCitation)> = candidates.into_iter().enumerate().collect();
    indexed.sort_by_key(|(order, c)| (c.start, std::cmp::Reverse(c.end - c.start), *order));

    let mut kept: Vec<RawCitation> = Vec::with_capacity(indexed.len());
    for (_, candidate) in indexed {
        if kept.last().is_some_and(|last| last.span().overlaps(&candidate.span())) {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.parse::<u32>().is_ok_and(|y| (1600..=2100).contains(&y))
}

/// Only commas, semicolons and whitespace, with at least one separator.
fn is_parallel_gap(gap: &str, window: usize) -> bool {
    gap.len() <= window
        && gap.contains([',', ';'])
        && gap.chars().all(|c| c.is_whitespace() || c == ',' || c == ';')
}

fn name_mentions(name: &str, party: &str) -> bool {
    let words: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    party
        .split_whitespace()
        .filter(|w| *w != "&")
        .all(|p| words.contains(&p.to_lowercase()))
}
