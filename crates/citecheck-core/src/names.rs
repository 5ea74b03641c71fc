//! Case-name tokens and the overlap score used by the verification gate.
//!
//! Names are compared on their *distinctive* tokens: lowercase words with
//! connectors ("v.", "inc.", "llc", "&") and generic party words ("state",
//! "people", "in re marriage of") removed, and common Bluebook abbreviations
//! expanded ("Dep't" → "department"). "State v. Smith" and "State v. Jones"
//! therefore share no tokens.

use std::collections::BTreeSet;

/// Words that join parties or qualify entity types. Never distinctive.
const CONNECTORS: &[&str] = &[
    "v", "vs", "versus", "in", "re", "ex", "rel", "parte", "of", "the", "and", "a", "an", "for",
    "on", "behalf", "et", "al", "inc", "incorporated", "llc", "llp", "lp", "ltd", "limited",
    "co", "corp", "corporation", "company", "plc", "pc", "pllc", "na", "as", "by", "to", "at",
];

/// Parties common enough that sharing them says nothing about identity.
const GENERIC_PARTIES: &[&str] = &[
    "state", "states", "united", "people", "commonwealth", "government", "america", "usa", "us",
    "city", "county", "town", "village", "matter", "marriage", "estate", "guardianship",
    "adoption", "welfare", "dependency", "detention", "personal", "restraint", "petition",
    "application", "washington", "california", "oregon", "new", "york", "unknown",
];

/// Bluebook abbreviations in case names and their expansions.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("dep't", "department"),
    ("dept", "department"),
    ("gov't", "government"),
    ("ass'n", "association"),
    ("assn", "association"),
    ("nat'l", "national"),
    ("int'l", "international"),
    ("univ", "university"),
    ("bd", "board"),
    ("educ", "education"),
    ("comm'n", "commission"),
    ("comm'r", "commissioner"),
    ("sec'y", "secretary"),
    ("mfg", "manufacturing"),
    ("ins", "insurance"),
    ("cnty", "county"),
    ("hosp", "hospital"),
    ("mut", "mutual"),
    ("ry", "railway"),
    ("r.r", "railroad"),
    ("serv", "services"),
    ("servs", "services"),
    ("sys", "systems"),
    ("tel", "telephone"),
    ("transp", "transportation"),
    ("prop", "property"),
    ("props", "properties"),
    ("fin", "financial"),
    ("grp", "group"),
    ("wash", "washington"),
    ("cal", "california"),
];

/// Signals and short forms that stand where a case name would be.
const CROSS_REFERENCES: &[&str] = &[
    "id", "id.", "ibid", "ibid.", "supra", "infra", "aff'd", "affd", "rev'd", "revd",
    "cert. denied", "cert denied", "overruled", "abrogated", "quoting", "citing", "accord",
];

/// Whether `text` is a cross-reference signal rather than a case name.
pub fn is_cross_reference(text: &str) -> bool {
    let lower = text.trim().trim_matches(|c| c == ',' || c == ';').to_ascii_lowercase();
    if lower.is_empty() {
        return false;
    }
    CROSS_REFERENCES.contains(&lower.as_str())
        || lower.starts_with("id.")
        || lower.starts_with("id ")
        || lower.contains("supra")
        || lower.starts_with("aff'd")
        || lower.starts_with("rev'd")
}

/// Whether `name` contains a case-name connector ("v.", "In re", "ex rel.").
pub fn has_case_connector(name: &str) -> bool {
    let lower = format!(" {} ", name.to_ascii_lowercase());
    [" v. ", " v ", " vs. ", " vs ", " in re ", " ex rel. ", " ex rel ", " ex parte ", " matter of "]
        .iter()
        .any(|c| lower.contains(c))
}

/// A name good enough to validate a candidate against.
pub fn is_usable_case_name(name: Option<&str>, min_len: usize) -> bool {
    let Some(name) = name.map(str::trim) else {
        return false;
    };
    name.chars().count() >= min_len
        && !is_cross_reference(name)
        && has_case_connector(name)
        && !distinctive_tokens(name).is_empty()
}

/// Distinctive tokens of a case name, sorted and de-duplicated.
pub fn distinctive_tokens(name: &str) -> BTreeSet<String> {
    name.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '(' | ')' | '/' | '"'))
        .filter_map(normalize_word)
        .filter(|w| !CONNECTORS.contains(&w.as_str()) && !GENERIC_PARTIES.contains(&w.as_str()))
        .collect()
}

/// Share of distinctive tokens the two names have in common, over the larger
/// token set. 0.0 when either side has no distinctive tokens.
pub fn overlap_score(extracted: &str, candidate: &str) -> f32 {
    let left = distinctive_tokens(extracted);
    let right = distinctive_tokens(candidate);
    let denominator = left.len().max(right.len());
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f32 / denominator as f32
}

fn normalize_word(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '&')
        .to_lowercase();
    if trimmed.is_empty() || trimmed == "&" {
        return None;
    }
    let bare = trimmed.trim_end_matches('.');
    if let Some((_, full)) = ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == bare) {
        return Some((*full).to_string());
    }
    let cleaned: String = bare.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectors_and_generic_parties_are_stripped() {
        let tokens = distinctive_tokens("State ex rel. Smith v. Acme Mfg. Co., Inc.");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["acme", "manufacturing", "smith"]
        );
    }

    #[test]
    fn identical_names_score_one() {
        assert_eq!(overlap_score("Doe v. Roe", "Doe v. Roe"), 1.0);
    }

    #[test]
    fn generic_party_does_not_count_as_overlap() {
        assert_eq!(overlap_score("State v. Smith", "State v. Jones"), 0.0);
        assert_eq!(
            overlap_score("In re Marriage of Smith", "In re Marriage of Jones"),
            0.0
        );
    }

    #[test]
    fn abbreviations_match_expansions() {
        let score = overlap_score(
            "Brown v. Bd. of Educ.",
            "Brown v. Board of Education",
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn longer_candidate_dilutes_score() {
        let score = overlap_score("Smith v. Jones", "Smith v. Jones Holdings Acme Widgets");
        assert!(score < 0.5, "{score}");
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(overlap_score("", "Doe v. Roe"), 0.0);
        assert_eq!(overlap_score("State v. State", "Doe v. Roe"), 0.0);
    }

    #[test]
    fn cross_reference_signals() {
        assert!(is_cross_reference("Id."));
        assert!(is_cross_reference("id. at 47"));
        assert!(is_cross_reference("Doe, supra"));
        assert!(is_cross_reference("aff'd,"));
        assert!(!is_cross_reference("Doe v. Roe"));
        assert!(!is_cross_reference("Idaho Power Co. v. Roe"));
    }

    #[test]
    fn usable_names() {
        assert!(is_usable_case_name(Some("Doe v. Roe"), 5));
        assert!(is_usable_case_name(Some("In re Estate of Hastings"), 5));
        assert!(!is_usable_case_name(Some("Id."), 5));
        assert!(!is_usable_case_name(Some("Doe"), 5));
        assert!(!is_usable_case_name(Some("Smith Jones"), 5));
        assert!(!is_usable_case_name(None, 5));
    }
}
