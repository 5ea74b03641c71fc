//! Tokenizing recognizer for well-formed `volume reporter page` citations.
//!
//! The document is split into word and punctuation tokens that keep their
//! byte offsets. A citation is a number (volume), followed by a run of words
//! forming a known reporter abbreviation, followed by a number (page), with
//! optional pin cites. `volume reporter at pin` yields a short form.

use citecheck_core::CitationKind;
use citecheck_core::reporter::{self, MAX_REPORTER_TOKENS};

use crate::RawCitation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    fn is_punct(&self) -> bool {
        self.text.len() == 1 && is_punct_char(self.text.chars().next().unwrap_or(' '))
    }

    /// Digits, optionally followed by a sentence-ending period.
    fn number(&self) -> Option<&str> {
        let digits = self.text.strip_suffix('.').unwrap_or(self.text);
        (!digits.is_empty() && digits.len() <= 5 && digits.bytes().all(|b| b.is_ascii_digit()))
            .then_some(digits)
    }
}

fn is_punct_char(c: char) -> bool {
    matches!(c, ',' | ';' | '(' | ')' | '[' | ']' | '"' | '\u{201c}' | '\u{201d}')
}

/// Split text into word and single-character punctuation tokens.
pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() || is_punct_char(c) {
            if let Some(start) = word_start.take() {
                tokens.push(Token { text: &text[start..i], start, end: i });
            }
            if !c.is_whitespace() {
                let end = i + c.len_utf8();
                tokens.push(Token { text: &text[i..end], start: i, end });
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token { text: &text[start..], start, end: text.len() });
    }
    tokens
}

/// Longest reporter starting at `tokens[i]`, stopping at punctuation.
fn reporter_at(tokens: &[Token<'_>], i: usize) -> Option<(&'static reporter::ReporterSpec, usize)> {
    let words: Vec<&str> = tokens[i..]
        .iter()
        .take(MAX_REPORTER_TOKENS)
        .take_while(|t| !t.is_punct())
        .map(|t| t.text)
        .collect();
    reporter::match_tokens(&words)
}

/// Whether a volume-reporter pair begins at `tokens[i]`.
fn starts_citation(tokens: &[Token<'_>], i: usize) -> bool {
    tokens.get(i).and_then(Token::number).is_some()
        && i + 1 < tokens.len()
        && reporter_at(tokens, i + 1).is_some()
}

/// `47` or `47-48` starting at `tokens[i]`; returns the pin text and the index after it.
fn pin_at(tokens: &[Token<'_>], i: usize) -> Option<(String, usize, usize)> {
    let tok = tokens.get(i)?;
    if let Some(n) = tok.number() {
        return Some((n.to_string(), i + 1, tok.start + n.len()));
    }
    // Ranges are a single word token: "47-48" or "47–48".
    let sep = tok.text.find(['-', '\u{2013}'])?;
    let sep_len = tok.text[sep..].chars().next()?.len_utf8();
    let a = &tok.text[..sep];
    let b = &tok.text[sep + sep_len..];
    let b = b.strip_suffix('.').unwrap_or(b);
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    (numeric(a) && numeric(b))
        .then(|| (format!("{a}-{b}"), i + 1, tok.start + sep + sep_len + b.len()))
}

/// Recognize reporter citations and short forms.
pub(crate) fn recognize(text: &str) -> Vec<RawCitation> {
    let tokens = tokenize(text);
    let mut found = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let Some(volume) = tokens[i].number().filter(|v| v.len() <= 4) else {
            i += 1;
            continue;
        };
        let Some((spec, used)) = reporter_at(&tokens, i + 1) else {
            i += 1;
            continue;
        };
        let after = i + 1 + used;
        let start = tokens[i].start;

        // Short form: "123 Wn.2d at 47".
        if tokens.get(after).is_some_and(|t| t.text == "at")
            && let Some((pin, next, end)) = pin_at(&tokens, after + 1)
        {
            found.push(RawCitation {
                kind: CitationKind::Short,
                start,
                end,
                raw_text: text[start..end].to_string(),
                normalized_text: format!("{volume} {} at {pin}", spec.canonical),
                volume: Some(volume.to_string()),
                reporter: Some(spec.canonical.to_string()),
                page: None,
                pin_cite: Some(pin),
            });
            i = next;
            continue;
        }

        let Some(page) = tokens.get(after).and_then(Token::number) else {
            i += 1;
            continue;
        };
        let mut end = tokens[after].start + page.len();
        let mut next = after + 1;
        let mut pins = Vec::new();

        // Pin cites: ", 47" or ", 47-48", unless the number opens the next citation.
        while tokens.get(next).is_some_and(|t| t.text == ",")
            && !starts_citation(&tokens, next + 1)
            && let Some((pin, after_pin, pin_end)) = pin_at(&tokens, next + 1)
        {
            pins.push(pin);
            end = pin_end;
            next = after_pin;
        }

        found.push(RawCitation {
            kind: CitationKind::Full,
            start,
            end,
            raw_text: text[start..end].to_string(),
            normalized_text: reporter::normalize_citation(volume, spec.canonical, page),
            volume: Some(volume.trim_start_matches('0').to_string()),
            reporter: Some(spec.canonical.to_string()),
            page: Some(page.trim_start_matches('0').to_string()),
            pin_cite: (!pins.is_empty()).then(|| pins.join(", ")),
        });
        i = next;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_keep_offsets() {
        let text = "Doe v. Roe, 123 Wn.2d 45 (1999).";
        let tokens = tokenize(text);
        for t in &tokens {
            assert_eq!(&text[t.start..t.end], t.text);
        }
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(
            texts,
            vec!["Doe", "v.", "Roe", ",", "123", "Wn.2d", "45", "(", "1999", ")", "."]
        );
    }

    #[test]
    fn full_citation() {
        let found = recognize("See Roe v. Wade, 410 U.S. 113 (1973).");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "410 U.S. 113");
        assert_eq!(found[0].normalized_text, "410 U.S. 113");
        assert_eq!(found[0].kind, CitationKind::Full);
    }

    #[test]
    fn multi_token_reporter_variant_is_normalized() {
        let found = recognize("Doe v. Roe, 123 Wash. 2d 45, 50 (1994)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "123 Wash. 2d 45, 50");
        assert_eq!(found[0].normalized_text, "123 Wn.2d 45");
        assert_eq!(found[0].pin_cite.as_deref(), Some("50"));
    }

    #[test]
    fn parallel_citations_are_separate() {
        let found = recognize("Doe v. Roe, 123 Wn.2d 45, 47, 456 P.3d 78 (1999)");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw_text, "123 Wn.2d 45, 47");
        assert_eq!(found[1].raw_text, "456 P.3d 78");
    }

    #[test]
    fn page_at_sentence_end() {
        let found = recognize("That was settled in 5 F.3d 10.");
        assert_eq!(found[0].raw_text, "5 F.3d 10");
    }

    #[test]
    fn short_form() {
        let found = recognize("Doe, 123 Wn.2d at 47-48.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, CitationKind::Short);
        assert_eq!(found[0].normalized_text, "123 Wn.2d at 47-48");
        assert_eq!(found[0].raw_text, "123 Wn.2d at 47-48");
    }

    #[test]
    fn unknown_abbreviation_ignored() {
        assert!(recognize("We reviewed 42 U.S.C. 1983 and 12 apples 4").is_empty());
    }
}
