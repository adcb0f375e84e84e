//! Candidate term extraction from headline text.
//!
//! Three kinds of fragments are pulled out of an item's text, in this order:
//! hashtags, runs of capitalized words, then remaining letter-only words of at
//! least four characters. A fragment never overlaps one already captured by an
//! earlier rule, so `#Paris` yields a single hashtag and `Jean Castex` a
//! single proper-noun phrase.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::vocabulary::Lexicon;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("valid hashtag regex"));
static PROPER_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Lu}[\p{L}'’\-]+(?:\s+\p{Lu}[\p{L}'’\-]+)*").expect("valid proper noun regex")
});
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{L}{4,}\b").expect("valid word regex"));

const MASK: &str = "\u{1}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Hashtag,
    ProperNoun,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    /// Fragment as written, punctuation removed
    pub surface: String,
    /// Merge key
    pub normalized: String,
}

/// Title and body joined with all whitespace runs collapsed to one space.
pub fn item_text(title: &str, content: &str) -> String {
    collapse_whitespace(&format!("{} {}", title, content))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_kept(c: char) -> bool {
    c.is_alphanumeric() || c == '#' || c == '-' || c == '\'' || c.is_whitespace()
}

fn tidy(text: &str) -> String {
    collapse_whitespace(text)
        .trim_matches(|c: char| c == '-' || c == '\'' || c.is_whitespace())
        .to_string()
}

/// Strip punctuation from a fragment while keeping its case and accents.
pub fn clean_surface(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| if c == '’' { '\'' } else { c })
        .filter(|c| is_kept(*c))
        .collect();
    tidy(&kept)
}

/// Canonical form of a fragment: lowercase, no diacritics, only letters,
/// digits, `#`, hyphens, apostrophes and single inner spaces.
///
/// `normalize(&normalize(x)) == normalize(x)` for every input.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .replace('’', "'")
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| is_kept(*c))
        .collect();
    tidy(&folded)
}

/// Raw fragments in extraction order, before normalization and filtering.
pub fn raw_candidates(text: &str) -> Vec<(CandidateKind, &str)> {
    // Claimed spans are overwritten with a one-byte control character, which
    // keeps offsets intact and is neither a letter nor whitespace, so no later
    // rule can match into or across a claimed span.
    let mut masked = text.to_string();
    let mut out = Vec::new();

    let rules: [(CandidateKind, &Regex); 3] = [
        (CandidateKind::Hashtag, &*HASHTAG_RE),
        (CandidateKind::ProperNoun, &*PROPER_NOUN_RE),
        (CandidateKind::Word, &*WORD_RE),
    ];

    for (kind, re) in rules {
        let spans: Vec<(usize, usize)> = re
            .find_iter(&masked)
            .map(|m| (m.start(), m.end()))
            .collect();
        for (start, end) in spans {
            out.push((kind, &text[start..end]));
            masked.replace_range(start..end, &MASK.repeat(end - start));
        }
    }

    out
}

/// Normalized candidates of `text`, with empty forms and stopwords removed.
pub fn extract_candidates(text: &str, lexicon: &Lexicon) -> Vec<Candidate> {
    raw_candidates(text)
        .into_iter()
        .filter_map(|(kind, fragment)| {
            let normalized = normalize(fragment);
            if normalized.is_empty() || lexicon.is_stopword(&normalized) {
                return None;
            }
            Some(Candidate {
                kind,
                surface: clean_surface(fragment),
                normalized,
            })
        })
        .collect()
}
