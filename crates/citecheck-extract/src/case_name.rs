//! Case-name and year extraction from the text surrounding a citation.
//!
//! Strategies for the name run in order until one succeeds:
//!
//! 1. a "Name v. Name" ending right before the citation, within the narrow window;
//! 2. the same within the wide window, after stripping trailing parentheticals,
//!    docket numbers and quotes between the name and the citation;
//!
//! and before either, a cross-reference signal ("Id.", "supra", "aff'd")
//! immediately before the citation leaves the name absent. Windows never
//! reach back past the previous citation, so a parallel citation cannot
//! borrow its neighbour's name; clustering supplies it instead.

use std::sync::LazyLock;

use citecheck_core::names;
use citecheck_core::reporter;
use regex::Regex;

static CONNECTOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s(v\.|vs\.|v)\s").unwrap());

static PREFIX_CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(In re|Ex parte|In the Matter of|Matter of)\s").unwrap());

static TRAILING_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)\s*$").unwrap());

static TRAILING_DOCKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:,\s*)?No\.\s*[\w-]+\s*$").unwrap());

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s,]*\(([^()]{0,60}?)\s*(\d{4})\)").unwrap()
});

static TRAILING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:Jan|Feb|Mar|Apr|May|June?|July?|Aug|Sept?|Oct|Nov|Dec)\.?\s+\d{1,2},?\s*$")
        .unwrap()
});

/// Lowercase words that may appear inside a party name.
const NAME_PARTICLES: &[&str] = &[
    "of", "the", "and", "&", "for", "ex", "rel.", "de", "la", "del", "van", "von", "on", "behalf",
    "in", "re", "et", "al.", "a", "an", "to", "by",
];

/// Words that open a sentence or signal and are never part of a name.
const STOP_WORDS: &[&str] = &[
    "see", "also", "cf.", "cf", "accord", "compare", "contra", "but", "e.g.", "e.g.,", "quoting",
    "citing", "under", "following", "applying", "although", "because", "when", "since", "thus",
    "here", "moreover", "however", "therefore", "and", "with", "in", "held", "as", "while", "where",
];

/// Abbreviations that end with a period without ending a sentence.
const NAME_ABBREVIATIONS: &[&str] = &[
    "co.", "corp.", "inc.", "ltd.", "bros.", "mfg.", "st.", "u.s.", "n.a.", "bd.", "educ.",
    "dist.", "sch.", "ins.", "ass'n.", "nat'l.", "dep't.", "ry.", "r.r.", "univ.", "hosp.", "mun.",
    "cnty.", "twp.", "mr.", "mrs.", "dr.", "jr.", "sr.", "l.l.c.", "l.p.", "p.c.", "wash.", "cal.",
];

const MAX_PLAINTIFF_WORDS: usize = 8;
const MAX_DEFENDANT_WORDS: usize = 10;

/// Smallest char boundary at or after `i`.
pub(crate) fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i.min(text.len())
}

/// Extract the case name for a citation starting at `start`, not looking
/// back past `floor` (the end of the previous citation).
pub fn extract_case_name(
    text: &str,
    floor: usize,
    start: usize,
    name_window: usize,
    wide_window: usize,
    min_len: usize,
) -> Option<String> {
    if start > text.len() || floor > start {
        return None;
    }
    let preceding = &text[floor..start];
    if follows_cross_reference(preceding) {
        return None;
    }

    let narrow_from = ceil_boundary(text, start.saturating_sub(name_window).max(floor));
    if let Some(name) = name_ending_at(&text[narrow_from..start]).filter(|n| is_plausible(n, min_len)) {
        return Some(name);
    }

    let wide_from = ceil_boundary(text, start.saturating_sub(wide_window).max(floor));
    let mut window = text[wide_from..start].trim_end_matches(trailing_noise);
    for _ in 0..3 {
        let stripped = TRAILING_PAREN
            .find(window)
            .or_else(|| TRAILING_DOCKET.find(window))
            .map(|m| &window[..m.start()]);
        match stripped {
            Some(s) => window = s.trim_end_matches(trailing_noise),
            None => break,
        }
    }
    name_ending_at(window).filter(|n| is_plausible(n, min_len))
}

fn trailing_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '"' | '\'' | '\u{201d}' | '\u{2014}' | '-' | ':')
}

/// Whether the text right before a citation ends with a cross-reference signal.
fn follows_cross_reference(preceding: &str) -> bool {
    let tail = preceding.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    let Some(last) = tail.split_whitespace().last() else {
        return false;
    };
    names::is_cross_reference(last)
}

/// A "Name v. Name" or "In re Name" that runs to the end of `window`.
fn name_ending_at(window: &str) -> Option<String> {
    let head = window.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    if head.is_empty() {
        return None;
    }

    if let Some(conn) = CONNECTOR.find_iter(head).last() {
        let defendant = head[conn.end()..].trim();
        let defendant_words: Vec<&str> = defendant.split_whitespace().collect();
        if defendant_words.is_empty()
            || defendant_words.len() > MAX_DEFENDANT_WORDS
            || !defendant.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit())
            || defendant.contains([';', ':', '(', ')'])
            || defendant_words.contains(&"No.")
            || ends_sentence_inside(&defendant_words)
        {
            return None;
        }
        let plaintiff = plaintiff_before(&head[..conn.start()])?;
        let joined = format!("{} {} {}", plaintiff, conn.as_str().trim(), defendant_words.join(" "));
        return Some(joined);
    }

    let prefix = PREFIX_CONNECTOR.find_iter(head).last()?;
    let rest: Vec<&str> = head[prefix.end()..].split_whitespace().collect();
    if rest.is_empty() || rest.len() > MAX_DEFENDANT_WORDS || ends_sentence_inside(&rest) {
        return None;
    }
    Some(format!("{} {}", prefix.as_str().trim(), rest.join(" ")))
}

/// Walk back from the connector collecting capitalized words and particles.
fn plaintiff_before(text: &str) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    for word in text.split_whitespace().rev() {
        let lower = word.to_lowercase();
        let bare = lower.trim_matches(|c: char| matches!(c, '(' | ')' | '"' | '\u{201c}'));
        if words.len() >= MAX_PLAINTIFF_WORDS
            || word.ends_with([',', ';', ':', ')'])
            || STOP_WORDS.contains(&bare)
        {
            // "In re" and "ex rel." are part of the name, not a stop.
            if !(bare == "in" && words.first().is_some_and(|w| w.eq_ignore_ascii_case("re"))) {
                break;
            }
        }
        let capitalized = word.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit());
        if !capitalized && !NAME_PARTICLES.contains(&bare) {
            break;
        }
        if word.ends_with('.') && !is_abbreviation(&lower) && (!capitalized || word.len() > 5) {
            break;
        }
        words.insert(0, word);
    }
    // Particles cannot open a name: "and Smith v. Jones" is "Smith v. Jones".
    while words
        .first()
        .is_some_and(|w| !w.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit()))
    {
        words.remove(0);
    }
    (!words.is_empty()).then(|| words.join(" "))
}

fn is_abbreviation(lower: &str) -> bool {
    NAME_ABBREVIATIONS.contains(&lower)
        || lower.len() <= 4
        || lower.trim_end_matches('.').contains('.')
        || lower.contains('\'')
}

/// A sentence break inside the defendant: a non-abbreviated word ending in
/// a period followed by more words.
fn ends_sentence_inside(words: &[&str]) -> bool {
    words.iter().take(words.len().saturating_sub(1)).any(|w| {
        let lower = w.to_lowercase();
        w.ends_with('.') && !is_abbreviation(&lower)
    })
}

/// Edge-case policy: long enough, has a connector, and is not itself a
/// fragment of a neighbouring citation.
pub fn is_plausible(name: &str, min_len: usize) -> bool {
    name.chars().count() >= min_len
        && names::has_case_connector(name)
        && !names::is_cross_reference(name)
        && !contains_citation_fragment(name)
}

fn contains_citation_fragment(name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    words.windows(2).any(|pair| {
        let volume = pair[0].trim_end_matches(',');
        !volume.is_empty()
            && volume.bytes().all(|b| b.is_ascii_digit())
            && reporter::match_tokens(&[pair[1]]).is_some()
    })
}

/// Year and court hint from a parenthetical adjacent to the citation end.
///
/// `after` is the text following the citation. Returns `(year, court)`.
pub fn parenthetical_after(after: &str, window: usize) -> Option<(String, Option<String>)> {
    let end = ceil_boundary(after, window.min(after.len()));
    let caps = PARENTHETICAL.captures(&after[..end])?;
    let year = caps.get(2)?.as_str();
    let numeric: u32 = year.parse().ok()?;
    if !(1600..=2100).contains(&numeric) {
        return None;
    }
    let court = caps
        .get(1)
        .map(|m| TRAILING_DATE.replace(m.as_str(), "").trim().to_string())
        .filter(|c| !c.is_empty());
    Some((year.to_string(), court))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_before(text: &str, citation: &str) -> Option<String> {
        let start = text.find(citation).unwrap();
        extract_case_name(text, 0, start, 120, 300, 5)
    }

    #[test]
    fn simple_name() {
        assert_eq!(
            name_before("Doe v. Roe, 123 Wn.2d 45 (1999).", "123 Wn.2d"),
            Some("Doe v. Roe".into())
        );
    }

    #[test]
    fn signal_word_excluded() {
        assert_eq!(
            name_before("See also Brown v. Board of Education, 347 U.S. 483 (1954).", "347 U.S."),
            Some("Brown v. Board of Education".into())
        );
    }

    #[test]
    fn corporate_abbreviations_kept() {
        assert_eq!(
            name_before("The court relied on Acme Corp. v. Widget Co., 5 F.3d 10.", "5 F.3d"),
            Some("Acme Corp. v. Widget Co.".into())
        );
    }

    #[test]
    fn sentence_boundary_stops_plaintiff() {
        assert_eq!(
            name_before("That ended the inquiry. State v. Smith, 1 Wn.2d 1.", "1 Wn.2d"),
            Some("State v. Smith".into())
        );
    }

    #[test]
    fn in_re_name() {
        assert_eq!(
            name_before("In re Marriage of Hall, 103 Wn.2d 236 (1984).", "103 Wn.2d"),
            Some("In re Marriage of Hall".into())
        );
    }

    #[test]
    fn wide_window_skips_parenthetical_and_docket() {
        assert_eq!(
            name_before("Doe v. Roe (Doe II), No. 12-345, 123 Wn.2d 45.", "123 Wn.2d"),
            Some("Doe v. Roe".into())
        );
    }

    #[test]
    fn id_signal_leaves_name_absent() {
        assert_eq!(name_before("Id. 123 Wn.2d 45", "123 Wn.2d"), None);
        assert_eq!(name_before("Doe v. Roe, aff'd, 456 P.3d 78", "456 P.3d"), None);
    }

    #[test]
    fn floor_prevents_borrowing_neighbour_name() {
        let text = "Doe v. Roe, 123 Wn.2d 45, 456 P.3d 78 (1999)";
        let floor = text.find(", 456").unwrap();
        let start = text.find("456").unwrap();
        assert_eq!(extract_case_name(text, floor, start, 120, 300, 5), None);
    }

    #[test]
    fn citation_fragment_rejected() {
        assert!(!is_plausible("45 Wn.2d Doe v. Roe", 5));
        assert!(is_plausible("Doe v. Roe", 5));
        assert!(!is_plausible("v. R", 5));
    }

    #[test]
    fn year_and_court() {
        assert_eq!(parenthetical_after(" (1999).", 60), Some(("1999".into(), None)));
        assert_eq!(
            parenthetical_after(" (9th Cir. 2001)", 60),
            Some(("2001".into(), Some("9th Cir.".into())))
        );
        assert_eq!(
            parenthetical_after(", (Wash. Ct. App. Mar. 3, 2005)", 60),
            Some(("2005".into(), Some("Wash. Ct. App.".into())))
        );
        assert_eq!(parenthetical_after(", 456 P.3d 78 (1999)", 60), None);
        assert_eq!(parenthetical_after(" (holding that 1234)", 60), None);
    }
}
