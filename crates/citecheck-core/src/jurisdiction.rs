//! Court systems implied by reporters, court parentheticals, and source metadata.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The court system a citation or candidate decision belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    Federal,
    /// Two-letter postal code, lowercase.
    State(String),
    /// Regional reporters (P.3d, N.E.2d, ...) collect many states.
    Regional,
    International,
    #[default]
    Unknown,
}

/// (postal code, full name, reporter/court abbreviation, CourtListener id of the high court)
const STATES: &[(&str, &str, &str, &str)] = &[
    ("al", "alabama", "ala.", "ala"),
    ("ak", "alaska", "alaska", "alaska"),
    ("az", "arizona", "ariz.", "ariz"),
    ("ar", "arkansas", "ark.", "ark"),
    ("ca", "california", "cal.", "cal"),
    ("co", "colorado", "colo.", "colo"),
    ("ct", "connecticut", "conn.", "conn"),
    ("de", "delaware", "del.", "del"),
    ("dc", "district of columbia", "d.c.", "dc"),
    ("fl", "florida", "fla.", "fla"),
    ("ga", "georgia", "ga.", "ga"),
    ("hi", "hawaii", "haw.", "haw"),
    ("id", "idaho", "idaho", "idaho"),
    ("il", "illinois", "ill.", "ill"),
    ("in", "indiana", "ind.", "ind"),
    ("ia", "iowa", "iowa", "iowa"),
    ("ks", "kansas", "kan.", "kan"),
    ("ky", "kentucky", "ky.", "ky"),
    ("la", "louisiana", "la.", "la"),
    ("me", "maine", "me.", "me"),
    ("md", "maryland", "md.", "md"),
    ("ma", "massachusetts", "mass.", "mass"),
    ("mi", "michigan", "mich.", "mich"),
    ("mn", "minnesota", "minn.", "minn"),
    ("ms", "mississippi", "miss.", "miss"),
    ("mo", "missouri", "mo.", "mo"),
    ("mt", "montana", "mont.", "mont"),
    ("ne", "nebraska", "neb.", "neb"),
    ("nv", "nevada", "nev.", "nev"),
    ("nh", "new hampshire", "n.h.", "nh"),
    ("nj", "new jersey", "n.j.", "nj"),
    ("nm", "new mexico", "n.m.", "nm"),
    ("ny", "new york", "n.y.", "ny"),
    ("nc", "north carolina", "n.c.", "nc"),
    ("nd", "north dakota", "n.d.", "nd"),
    ("oh", "ohio", "ohio", "ohio"),
    ("ok", "oklahoma", "okla.", "okla"),
    ("or", "oregon", "or.", "or"),
    ("pa", "pennsylvania", "pa.", "pa"),
    ("ri", "rhode island", "r.i.", "ri"),
    ("sc", "south carolina", "s.c.", "sc"),
    ("sd", "south dakota", "s.d.", "sd"),
    ("tn", "tennessee", "tenn.", "tenn"),
    ("tx", "texas", "tex.", "tex"),
    ("ut", "utah", "utah", "utah"),
    ("vt", "vermont", "vt.", "vt"),
    ("va", "virginia", "va.", "va"),
    ("wa", "washington", "wash.", "wash"),
    ("wv", "west virginia", "w. va.", "wva"),
    ("wi", "wisconsin", "wis.", "wis"),
    ("wy", "wyoming", "wyo.", "wyo"),
];

/// Federal forms that stay federal even when a state is named: numbered
/// and lettered circuits, the claims and bankruptcy courts, "United States",
/// and district courts ("W.D. Wash.", "D. Or.", "Western District of ...").
/// Matched against lowercased text.
static FEDERAL_COURT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \b\d{1,2}(?:st|nd|rd|th)\s+cir\b
        | \b(?:fed|d\.\s?c)\.\s?cir\b
        | \bfed\.\s?cl\b
        | \bbankr\.
        | \bunited\s+states\b
        | \bu\.\s?s\.(?:\s|$)
        | \b(?:western|eastern|northern|southern|central|middle)\s+district\b
        | ^\s*[wensmc]\.\s?d\.\s*[a-z]
        | ^\s*d\.(?:\s+[a-z]|[abd-z])
        ",
    )
    .unwrap()
});

/// Federal only when no state is named: "Circuit Court" alone says nothing,
/// but "Ninth Circuit" or a Justia `federal` path does.
static FEDERAL_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh|federal)\s+circuit|court\s+of\s+appeals\s+for\s+the|federal)\b",
    )
    .unwrap()
});

const INTERNATIONAL_MARKERS: &[&str] = &[
    "uksc", "ukhl", "ukpc", "ewca", "ewhc", "united kingdom", "england", "canada", "scc",
    "australia", "hca", "new zealand", "nzsc",
];

impl Jurisdiction {
    /// Parse a reporter-table scope code: `fed`, `reg`, `intl`, or a postal code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "fed" => Self::Federal,
            "reg" => Self::Regional,
            "intl" => Self::International,
            "" => Self::Unknown,
            other => Self::State(other.to_ascii_lowercase()),
        }
    }

    /// A jurisdiction narrow enough to reject candidates from elsewhere.
    pub fn is_specific(&self) -> bool {
        matches!(self, Self::Federal | Self::State(_) | Self::International)
    }

    /// Whether a decision from `other` can be the decision cited in `self`.
    ///
    /// Unknown or regional on either side never rejects.
    pub fn is_compatible_with(&self, other: &Jurisdiction) -> bool {
        if !self.is_specific() || !other.is_specific() {
            return true;
        }
        self == other
    }

    /// Infer from a CourtListener court id (`wash`, `washctapp`, `ca9`, `wawd`, `scotus`).
    pub fn from_court_id(id: &str) -> Self {
        let id = id.trim().to_ascii_lowercase();
        if id.is_empty() {
            return Self::Unknown;
        }
        // High-court ids first: "ind" would otherwise read as a district court.
        if let Some((code, ..)) = STATES.iter().find(|(_, _, _, cl)| *cl == id) {
            return Self::State(code.to_string());
        }
        if is_federal_court_id(&id) {
            return Self::Federal;
        }
        STATES
            .iter()
            .filter(|(_, _, _, cl)| id.starts_with(cl))
            .max_by_key(|(_, _, _, cl)| cl.len())
            .map(|(code, ..)| Self::State(code.to_string()))
            .unwrap_or(Self::Unknown)
    }

    /// Infer from free court text: a Bluebook parenthetical ("9th Cir.",
    /// "Wash. Ct. App."), a court name, or a URL path (`/cases/washington/`).
    ///
    /// A named state beats generic court words, so "Circuit Court of Cook
    /// County, Illinois" and "Ill. Cir. Ct." are Illinois.
    pub fn from_court_text(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        if lower.trim().is_empty() {
            return Self::Unknown;
        }
        if FEDERAL_COURT.is_match(&lower) {
            return Self::Federal;
        }
        let words = lower.split(|c: char| !c.is_ascii_alphanumeric());
        if INTERNATIONAL_MARKERS.iter().any(|m| {
            if m.contains(' ') {
                lower.contains(m)
            } else {
                words.clone().any(|w| w == *m)
            }
        }) {
            return Self::International;
        }
        // Longest names first so "west virginia" wins over "virginia".
        let mut by_name: Vec<_> = STATES.iter().collect();
        by_name.sort_by_key(|(_, name, _, _)| std::cmp::Reverse(name.len()));
        for (code, name, abbr, _) in by_name {
            if lower.contains(name) || contains_abbreviation(&lower, abbr) {
                return Self::State(code.to_string());
            }
        }
        if FEDERAL_FALLBACK.is_match(&lower) {
            return Self::Federal;
        }
        Self::Unknown
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Federal => "federal",
            Self::State(code) => code.as_str(),
            Self::Regional => "regional",
            Self::International => "international",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(code) => write!(f, "state:{code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// `scotus`, circuits (`ca9`, `cadc`, `cafc`), and district/bankruptcy
/// courts (`wawd`, `nysd`, `nmd`, `wawb`).
fn is_federal_court_id(id: &str) -> bool {
    if id == "scotus" || id == "cadc" || id == "cafc" || id == "uscfc" {
        return true;
    }
    if let Some(rest) = id.strip_prefix("ca")
        && !rest.is_empty()
        && rest.chars().all(|c| c.is_ascii_digit())
    {
        return true;
    }
    let bytes = id.as_bytes();
    let tail_ok = |b: u8| b == b'd' || b == b'b';
    match bytes.len() {
        3 => tail_ok(bytes[2]),
        4 => b"nsewmc".contains(&bytes[2]) && tail_ok(bytes[3]),
        _ => false,
    }
}

/// Abbreviations are matched on word boundaries so "la." does not fire inside "cola.".
fn contains_abbreviation(haystack: &str, abbr: &str) -> bool {
    haystack.match_indices(abbr).any(|(i, _)| {
        i == 0
            || !haystack[..i]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.')
    })
}
