//! Word lists driving stopword filtering and keyword categorization.
//!
//! [`Vocabulary`] is plain configuration data: every list can be replaced from
//! the `[vocabulary]` section of the config file. [`Lexicon`] is the
//! normalized form used at extraction time, so that list entries written with
//! accents or capitals still match normalized candidates.

use std::collections::HashSet;

use serde::Deserialize;

use crate::candidates::normalize;

const STOPWORDS: &[&str] = &[
    // French
    "les", "des", "pour", "avec", "dans", "sur", "par", "une", "un", "le", "la", "et", "du", "de",
    "que", "qui", "en", "au", "aux", "ce", "ces", "se", "son", "sa", "ses", "sont", "est", "à",
    "vous", "nous", "ils", "elle", "elles", "lui", "leur", "leurs", "cette", "cet", "mais",
    "comme", "tout", "tous", "toute", "toutes", "plus", "moins", "entre", "après", "avant",
    "sans", "sous", "chez", "être", "avoir", "fait", "faire", "ont", "était", "sera", "peut",
    "encore", "aussi", "depuis", "selon", "contre", "quand", "dont", "où", "alors", "ainsi",
    "donc", "car", "deux", "trois", "très", "même", "notre", "votre", "pas", "ne",
    // English
    "the", "and", "for", "with", "from", "that", "this", "these", "those", "have", "has", "had",
    "was", "were", "will", "would", "been", "being", "are", "not", "but", "about", "after",
    "before", "over", "under", "into", "than", "then", "they", "them", "their", "there", "what",
    "when", "where", "which", "while", "your", "you", "our", "its", "also", "just", "more",
    "most", "some", "such", "only", "other", "very", "can", "could", "should", "may", "might",
    "says", "said",
];

const PEOPLE: &[&str] = &[
    "macron", "biden", "trump", "le pen", "villepin", "assad", "poutine", "putin", "zelensky",
    "zelenski", "netanyahu", "starmer", "bayrou", "barnier", "mélenchon", "bardella",
];

const POLITICS: &[&str] = &[
    "president", "président", "ministre", "minister", "gouvern", "government", "parlement",
    "parliament", "élection", "election", "électoral", "electoral", "député", "sénat", "senate",
    "assemblée", "congress", "référendum", "referendum", "chancel", "kremlin", "élysée",
    "matignon", "maison blanche", "white house", "diplomat",
];

const CINEMA: &[&str] = &[
    "film", "cinéma", "cinema", "festival", "palme", "cannes", "réalisat", "acteur", "actrice",
    "actor", "actress", "oscar", "césar", "hollywood", "movie", "box-office",
];

const PLACES: &[&str] = &[
    "paris", "london", "londres", "moscou", "moscow", "beijing", "pékin", "seoul", "séoul",
    "usa", "france", "russia", "russie", "china", "chine", "uk", "onu", "ukraine", "kyiv",
    "kiev", "gaza", "israël", "israel", "iran", "syrie", "syria", "liban", "lebanon",
    "allemagne", "germany", "berlin", "italie", "italy", "rome", "espagne", "spain", "madrid",
    "bruxelles", "brussels", "japon", "japan", "tokyo", "inde", "india", "washington",
    "new york", "marseille", "lyon", "canada", "mexique", "mexico", "brésil", "brazil",
    "turquie", "turkey", "égypte", "egypt",
];

const GEO: &[&str] = &[
    "ukrain", "europ", "afriq", "afric", "asie", "asia", "amériq", "americ", "méditerran",
    "mediterran", "atlanti", "pacifi", "arcti", "frontière", "border",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Replaceable word lists, one per concern.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Function words never reported as topics
    pub stopwords: Vec<String>,
    /// Names of public figures, matched against the whole keyword
    pub people: Vec<String>,
    /// Political vocabulary, matched as substrings
    pub politics: Vec<String>,
    /// Film vocabulary, matched as substrings
    pub cinema: Vec<String>,
    /// Gazetteer of place names, matched against the keyword or one of its tokens
    pub places: Vec<String>,
    /// Geography fragments, matched as substrings
    pub geo: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            stopwords: owned(STOPWORDS),
            people: owned(PEOPLE),
            politics: owned(POLITICS),
            cinema: owned(CINEMA),
            places: owned(PLACES),
            geo: owned(GEO),
        }
    }
}

impl Vocabulary {
    pub fn lexicon(&self) -> Lexicon {
        Lexicon {
            stopwords: normalized_set(&self.stopwords),
            people: normalized_set(&self.people),
            politics: normalized_list(&self.politics),
            cinema: normalized_list(&self.cinema),
            places: normalized_set(&self.places),
            geo: normalized_list(&self.geo),
        }
    }
}

fn normalized_list(words: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = normalize(word);
        if !word.is_empty() && !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

fn normalized_set(words: &[String]) -> HashSet<String> {
    normalized_list(words).into_iter().collect()
}

/// Normalized lookup tables built from a [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    people: HashSet<String>,
    politics: Vec<String>,
    cinema: Vec<String>,
    places: HashSet<String>,
    geo: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Vocabulary::default().lexicon()
    }
}

impl Lexicon {
    pub fn is_stopword(&self, normalized: &str) -> bool {
        self.stopwords.contains(normalized)
    }

    pub fn is_known_person(&self, normalized: &str) -> bool {
        self.people.contains(normalized)
    }

    pub fn mentions_politics(&self, normalized: &str) -> bool {
        self.politics.iter().any(|w| normalized.contains(w.as_str()))
    }

    pub fn mentions_cinema(&self, normalized: &str) -> bool {
        self.cinema.iter().any(|w| normalized.contains(w.as_str()))
    }

    pub fn mentions_place(&self, normalized: &str) -> bool {
        self.places.contains(normalized)
            || normalized.split(' ').any(|token| self.places.contains(token))
            || self.geo.iter().any(|w| normalized.contains(w.as_str()))
    }
}
