//! Reporter abbreviation table and citation normalisation.
//!
//! Maps the spelling variants a brief may use for a reporter ("Wash. 2d",
//! "Wash.2d", "Wn. 2d") onto one canonical abbreviation ("Wn.2d") and the
//! jurisdiction the reporter implies.
//!
//! # Reporter families
//!
//! - Federal: U.S., S. Ct., L. Ed., F. series, F. Supp. series, F. App'x, B.R.
//! - Regional: A., P., N.E., N.W., S.E., S.W., So. series. These collect
//!   decisions from several states and imply no single jurisdiction.
//! - State: official state reporters (Wn.2d, Cal. 4th, N.Y.3d, Or. App., ...).
//!
//! Matching ignores case, whitespace and periods, so "F. Supp. 2d",
//! "F.Supp.2d" and "F Supp 2d" are the same reporter.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::jurisdiction::Jurisdiction;

/// One reporter series.
#[derive(Debug)]
pub struct ReporterSpec {
    pub canonical: &'static str,
    /// Scope code: `fed`, `reg`, or a state postal code.
    pub scope: &'static str,
    pub variants: &'static [&'static str],
}

impl ReporterSpec {
    pub fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction::from_code(self.scope)
    }
}

/// Longest reporter abbreviation, in whitespace-separated tokens.
pub const MAX_REPORTER_TOKENS: usize = 4;

macro_rules! reporter {
    ($canonical:expr, $scope:expr) => {
        ReporterSpec { canonical: $canonical, scope: $scope, variants: &[] }
    };
    ($canonical:expr, $scope:expr, [$($variant:expr),*]) => {
        ReporterSpec { canonical: $canonical, scope: $scope, variants: &[$($variant),*] }
    };
}

pub static REPORTERS: &[ReporterSpec] = &[
    // ── Federal ──
    reporter!("U.S.", "fed"),
    reporter!("S. Ct.", "fed"),
    reporter!("L. Ed.", "fed"),
    reporter!("L. Ed. 2d", "fed"),
    reporter!("F.", "fed"),
    reporter!("F.2d", "fed"),
    reporter!("F.3d", "fed"),
    reporter!("F.4th", "fed"),
    reporter!("F. Supp.", "fed"),
    reporter!("F. Supp. 2d", "fed"),
    reporter!("F. Supp. 3d", "fed"),
    reporter!("F. App'x", "fed", ["F. Appx.", "Fed. Appx.", "Fed. App'x"]),
    reporter!("B.R.", "fed"),
    reporter!("Fed. Cl.", "fed"),
    // ── Regional ──
    reporter!("A.", "reg"),
    reporter!("A.2d", "reg"),
    reporter!("A.3d", "reg"),
    reporter!("P.", "reg"),
    reporter!("P.2d", "reg"),
    reporter!("P.3d", "reg"),
    reporter!("N.E.", "reg"),
    reporter!("N.E.2d", "reg"),
    reporter!("N.E.3d", "reg"),
    reporter!("N.W.", "reg"),
    reporter!("N.W.2d", "reg"),
    reporter!("S.E.", "reg"),
    reporter!("S.E.2d", "reg"),
    reporter!("S.W.", "reg"),
    reporter!("S.W.2d", "reg"),
    reporter!("S.W.3d", "reg"),
    reporter!("So.", "reg"),
    reporter!("So. 2d", "reg"),
    reporter!("So. 3d", "reg"),
    // ── Washington ──
    reporter!("Wn.", "wa", ["Wash."]),
    reporter!("Wn.2d", "wa", ["Wash. 2d"]),
    reporter!("Wn. App.", "wa", ["Wash. App."]),
    reporter!("Wn. App. 2d", "wa", ["Wash. App. 2d"]),
    // ── California ──
    reporter!("Cal.", "ca"),
    reporter!("Cal. 2d", "ca"),
    reporter!("Cal. 3d", "ca"),
    reporter!("Cal. 4th", "ca"),
    reporter!("Cal. 5th", "ca"),
    reporter!("Cal. App.", "ca"),
    reporter!("Cal. App. 2d", "ca"),
    reporter!("Cal. App. 3d", "ca"),
    reporter!("Cal. App. 4th", "ca"),
    reporter!("Cal. App. 5th", "ca"),
    reporter!("Cal. Rptr.", "ca"),
    reporter!("Cal. Rptr. 2d", "ca"),
    reporter!("Cal. Rptr. 3d", "ca"),
    // ── New York ──
    reporter!("N.Y.", "ny"),
    reporter!("N.Y.2d", "ny"),
    reporter!("N.Y.3d", "ny"),
    reporter!("A.D.", "ny", ["App. Div."]),
    reporter!("A.D.2d", "ny", ["App. Div. 2d"]),
    reporter!("A.D.3d", "ny", ["App. Div. 3d"]),
    reporter!("N.Y.S.", "ny"),
    reporter!("N.Y.S.2d", "ny"),
    reporter!("N.Y.S.3d", "ny"),
    // ── Other states ──
    reporter!("Or.", "or"),
    reporter!("Or. App.", "or"),
    reporter!("Ill.", "il"),
    reporter!("Ill. 2d", "il"),
    reporter!("Ill. App. 3d", "il"),
    reporter!("Ohio St.", "oh"),
    reporter!("Ohio St. 2d", "oh"),
    reporter!("Ohio St. 3d", "oh"),
    reporter!("Mass.", "ma"),
    reporter!("Mich.", "mi"),
    reporter!("Pa.", "pa"),
    reporter!("N.J.", "nj"),
    reporter!("Minn.", "mn"),
    reporter!("Ariz.", "az"),
    reporter!("Colo.", "co"),
    reporter!("Nev.", "nv"),
    reporter!("Idaho", "id"),
    reporter!("Mont.", "mt"),
];

/// Compact key → reporter, covering canonical forms and variants.
static BY_KEY: LazyLock<HashMap<String, &'static ReporterSpec>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for spec in REPORTERS {
        map.insert(compact(spec.canonical), spec);
        for variant in spec.variants {
            map.insert(compact(variant), spec);
        }
    }
    map
});

/// Statutory "reporters" that look like `volume abbreviation page`.
const STATUTORY: &[&str] = &["usc", "usca", "cfr", "stat", "fedreg", "fr", "rcw", "wac", "ors"];

/// Lowercase with whitespace and periods removed: "Wash. 2d" → "wash2d".
pub fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a reporter abbreviation in any of its spellings.
pub fn lookup(abbreviation: &str) -> Option<&'static ReporterSpec> {
    BY_KEY.get(&compact(abbreviation)).copied()
}

/// Longest reporter formed by a prefix of `tokens`.
///
/// Returns the reporter and how many tokens it consumed. The first token
/// must start with an uppercase letter so ordinary prose ("so", "a") does
/// not read as a reporter.
pub fn match_tokens(tokens: &[&str]) -> Option<(&'static ReporterSpec, usize)> {
    let first = tokens.first()?;
    if !first.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let max = tokens.len().min(MAX_REPORTER_TOKENS);
    (1..=max).rev().find_map(|n| {
        let joined = tokens[..n].concat();
        BY_KEY.get(&compact(&joined)).map(|spec| (*spec, n))
    })
}

/// Whether an abbreviation names a statute compilation rather than a reporter.
pub fn is_statutory(abbreviation: &str) -> bool {
    STATUTORY.contains(&compact(abbreviation).as_str())
}

/// Normalised citation text: `"<volume> <canonical reporter> <page>"`.
///
/// "123 Wash. 2d 45" and "123 Wn.2d 45" both normalise to "123 Wn.2d 45".
pub fn normalize_citation(volume: &str, reporter: &str, page: &str) -> String {
    let canonical = lookup(reporter).map(|s| s.canonical).unwrap_or(reporter);
    format!(
        "{} {} {}",
        volume.trim_start_matches('0'),
        canonical,
        page.trim_start_matches('0')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn washington_variants_collapse() {
        for variant in ["Wn.2d", "Wash. 2d", "Wash.2d", "Wn. 2d", "wash 2d"] {
            assert_eq!(lookup(variant).map(|s| s.canonical), Some("Wn.2d"), "{variant}");
        }
    }

    #[test]
    fn normalized_text_uses_canonical_form() {
        assert_eq!(normalize_citation("123", "Wash. 2d", "45"), "123 Wn.2d 45");
        assert_eq!(normalize_citation("410", "U. S.", "113"), "410 U.S. 113");
        assert_eq!(normalize_citation("12", "F. Supp. 2d", "034"), "12 F. Supp. 2d 34");
    }

    #[test]
    fn longest_match_wins() {
        let tokens = ["F.", "Supp.", "2d", "100"];
        let (spec, used) = match_tokens(&tokens).unwrap();
        assert_eq!(spec.canonical, "F. Supp. 2d");
        assert_eq!(used, 3);

        let tokens = ["Wn.", "App.", "12"];
        let (spec, used) = match_tokens(&tokens).unwrap();
        assert_eq!(spec.canonical, "Wn. App.");
        assert_eq!(used, 2);
    }

    #[test]
    fn lowercase_prose_is_not_a_reporter() {
        assert!(match_tokens(&["so", "12"]).is_none());
        assert!(match_tokens(&["at", "47"]).is_none());
    }

    #[test]
    fn jurisdictions() {
        assert_eq!(lookup("Wn.2d").unwrap().jurisdiction(), Jurisdiction::State("wa".into()));
        assert_eq!(lookup("P.3d").unwrap().jurisdiction(), Jurisdiction::Regional);
        assert_eq!(lookup("F.3d").unwrap().jurisdiction(), Jurisdiction::Federal);
    }

    #[test]
    fn statutes_recognized() {
        assert!(is_statutory("U.S.C."));
        assert!(is_statutory("C.F.R."));
        assert!(is_statutory("Stat."));
        assert!(!is_statutory("U.S."));
    }

    #[test]
    fn compact_keys_are_unique() {
        let mut seen = HashMap::new();
        for spec in REPORTERS {
            for key in std::iter::once(spec.canonical).chain(spec.variants.iter().copied()) {
                if let Some(prev) = seen.insert(compact(key), spec.canonical) {
                    assert_eq!(prev, spec.canonical, "{key} collides");
                }
            }
        }
    }
}
