//! Supplementary regex recognizer.
//!
//! Catches the forms the reporter tokenizer misses: vendor citations
//! (Westlaw, Lexis), state public-domain citations, international neutral
//! citations, OCR-damaged Washington reporters, and the "Id." / "supra"
//! cross-references. Also finds statutory spans so both recognizers can drop
//! candidates that are really code sections.

use std::sync::LazyLock;

use citecheck_core::{CitationKind, Span};
use regex::Regex;

use crate::RawCitation;

static WESTLAW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\s+(WL)\s+(\d{3,})\b").unwrap());

static LEXIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\s+((?:[A-Z][A-Za-z.]*\s+){0,3}LEXIS)\s+(\d+)\b").unwrap()
});

static STATE_HYPHENATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(Ohio|NMSC|NMCA|NMCERT)-(\d+)\b").unwrap());

static STATE_NEUTRAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{4})\s+(ND\s+App|UT\s+App|WI\s+App|IL\s+App|OK\s+CIV\s+APP|ND|SD|MT|OK|UT|WI|WY|ME|VT|IL|COA|CO|Ark\.|S\.D\.|N\.D\.)\s+(\d{1,6})\b",
    )
    .unwrap()
});

static CANADIAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\s+(SCC|ONCA|BCCA|ABCA|QCCA|FCA|FC|ONSC|BCSC)\s+(\d{1,5})\b").unwrap()
});

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[(\d{4})\]\s+(?:(\d{1,2})\s+)?(UKSC|UKHL|UKPC|UKUT|EWCA\s+Civ|EWCA\s+Crim|EWHC|HCA|NZSC|SGCA|AC|QB|KB|Ch|WLR|All\s+ER|Fam)\s+(\d{1,5})(?:\s+\((?:[A-Za-z]+)\))?",
    )
    .unwrap()
});

/// Washington and Pacific reporters with the spaces lost in OCR ("123Wn.2d 45").
static COMPACTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,4})\s*(Wn\.\s?2d|Wn\.\s?App\.(?:\s?2d)?|Wash\.\s?2d|Wash\.\s?App\.|P\.\s?[23]d)\s*(\d{1,5})\b")
        .unwrap()
});

static ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([Ii]d\.|[Ii]bid\.)(?:,?\s+at\s+(\d+(?:\s*[-\u{2013}]\s*\d+)?))?").unwrap()
});

static SUPRA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([A-Z][\w'&-]*(?:\s+(?:&\s+)?[A-Z][\w'&-]*){0,2}),?\s+supra\b(?:,?\s+(?:at\s+)?(\d+(?:\s*[-\u{2013}]\s*\d+)?))?",
    )
    .unwrap()
});

static STATUTES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+\s+U\.?\s?S\.?\s?C\.?(?:\s?A\.?)?\s*(?:§+\s*)?\d+[\w.\-()]*",
        r"\b\d+\s+C\.?\s?F\.?\s?R\.?\s*(?:§+\s*|(?:pt|part)\.?\s*)?\d+[\w.\-]*",
        r"\b\d+\s+Stat\.\s+\d+",
        r"\b(?:RCW|WAC|ORS)\s+\d+[A-Z]?(?:\.\d+[A-Z]?)*",
        r"§+\s*\d+[\w.\-()]*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const SIGNAL_WORDS: &[&str] = &["See", "Cf.", "Accord", "But", "Compare", "Contra", "Also"];

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn neutral(caps: &regex::Captures<'_>, designator: usize, number: usize) -> Option<RawCitation> {
    let whole = caps.get(0)?;
    let year = caps.get(1)?.as_str();
    let designator = collapse_whitespace(caps.get(designator)?.as_str());
    let number = caps.get(number)?.as_str();
    Some(RawCitation {
        kind: CitationKind::Neutral,
        start: whole.start(),
        end: whole.end(),
        raw_text: whole.as_str().to_string(),
        normalized_text: collapse_whitespace(whole.as_str()),
        volume: Some(year.to_string()),
        reporter: Some(designator),
        page: Some(number.to_string()),
        pin_cite: None,
    })
}

/// Run every supplementary pattern over the text.
pub(crate) fn recognize(text: &str) -> Vec<RawCitation> {
    let mut found = Vec::new();

    for re in [&*WESTLAW, &*LEXIS, &*STATE_HYPHENATED, &*STATE_NEUTRAL, &*CANADIAN] {
        found.extend(re.captures_iter(text).filter_map(|caps| neutral(&caps, 2, 3)));
    }
    found.extend(BRACKETED.captures_iter(text).filter_map(|caps| neutral(&caps, 3, 4)));

    for caps in COMPACTED.captures_iter(text) {
        let (Some(whole), Some(volume), Some(reporter), Some(page)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let Some(spec) = citecheck_core::reporter::lookup(reporter.as_str()) else {
            continue;
        };
        found.push(RawCitation {
            kind: CitationKind::Full,
            start: whole.start(),
            end: whole.end(),
            raw_text: whole.as_str().to_string(),
            normalized_text: citecheck_core::normalize_citation(
                volume.as_str(),
                spec.canonical,
                page.as_str(),
            ),
            volume: Some(volume.as_str().to_string()),
            reporter: Some(spec.canonical.to_string()),
            page: Some(page.as_str().to_string()),
            pin_cite: None,
        });
    }

    found.extend(recognize_id(text));
    found.extend(recognize_supra(text));
    found
}

fn recognize_id(text: &str) -> Vec<RawCitation> {
    ID.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            // "Id. § 5" refers back to a statute.
            if text[whole.end()..].trim_start().starts_with('§') {
                return None;
            }
            let pin = caps.get(2).map(|m| m.as_str().replace(char::is_whitespace, ""));
            let normalized = match &pin {
                Some(p) => format!("Id. at {p}"),
                None => "Id.".to_string(),
            };
            Some(RawCitation {
                kind: CitationKind::Id,
                start: whole.start(),
                end: whole.end(),
                raw_text: whole.as_str().to_string(),
                normalized_text: normalized,
                volume: None,
                reporter: None,
                page: None,
                pin_cite: pin,
            })
        })
        .collect()
}

fn recognize_supra(text: &str) -> Vec<RawCitation> {
    SUPRA
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let party_match = caps.get(1)?;
            let mut party = party_match.as_str();
            let mut start = party_match.start();
            for signal in SIGNAL_WORDS {
                if let Some(rest) = party.strip_prefix(signal)
                    && rest.starts_with(char::is_whitespace)
                {
                    let trimmed = rest.trim_start();
                    start += party.len() - trimmed.len();
                    party = trimmed;
                }
            }
            if party.is_empty() {
                return None;
            }
            Some(RawCitation {
                kind: CitationKind::Supra,
                start,
                end: whole.end(),
                raw_text: text[start..whole.end()].to_string(),
                normalized_text: format!("{party}, supra"),
                volume: None,
                // The party word is what links a supra back to its case.
                reporter: Some(party.to_string()),
                page: None,
                pin_cite: caps.get(2).map(|m| m.as_str().to_string()),
            })
        })
        .collect()
}

/// Spans of statutory references ("42 U.S.C. § 1983", "RCW 9A.36.021").
pub(crate) fn statute_spans(text: &str) -> Vec<Span> {
    STATUTES
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| Span::new(m.start(), m.end())))
        .collect()
}
