//! Aggregation, scoring, ranking and categorization of candidate terms.
//!
//! Every candidate is merged on its normalized form. Occurrences count each
//! raw match; source credit is given at most once per item and per term.
//! Entries are ranked by `occurrences * ln(1 + sources)`, then by
//! occurrences, then by first sighting.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::candidates::{extract_candidates, item_text};
use crate::fetcher::FeedItem;
use crate::vocabulary::Lexicon;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicEntry {
    /// First surface form seen for this term
    pub keyword: String,
    pub normalized: String,
    pub occurrences: u32,
    /// Feed identifiers, sorted
    pub sources: Vec<String>,
    pub score: f64,
}

pub fn score(occurrences: u32, source_count: usize) -> f64 {
    f64::from(occurrences) * (source_count as f64).ln_1p()
}

#[derive(Debug)]
struct Tally {
    keyword: String,
    normalized: String,
    occurrences: u32,
    sources: BTreeSet<String>,
}

/// Accumulates candidates from any number of feeds and items.
pub struct TopicAggregator<'a> {
    lexicon: &'a Lexicon,
    tallies: Vec<Tally>,
    index: HashMap<String, usize>,
}

impl<'a> TopicAggregator<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            tallies: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add_feed(&mut self, source: &str, items: &[FeedItem]) {
        for item in items {
            self.add_item(source, item);
        }
    }

    pub fn add_item(&mut self, source: &str, item: &FeedItem) {
        let text = item_text(&item.title, &item.content);
        let mut credited: HashSet<String> = HashSet::new();

        for candidate in extract_candidates(&text, self.lexicon) {
            let slot = match self.index.get(&candidate.normalized) {
                Some(&slot) => slot,
                None => {
                    self.tallies.push(Tally {
                        keyword: candidate.surface.clone(),
                        normalized: candidate.normalized.clone(),
                        occurrences: 0,
                        sources: BTreeSet::new(),
                    });
                    let slot = self.tallies.len() - 1;
                    self.index.insert(candidate.normalized.clone(), slot);
                    slot
                }
            };

            let tally = &mut self.tallies[slot];
            tally.occurrences += 1;
            if credited.insert(candidate.normalized) {
                tally.sources.insert(source.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Every entry, best first.
    pub fn ranked(self) -> Vec<TopicEntry> {
        let mut entries: Vec<TopicEntry> = self
            .tallies
            .into_iter()
            .map(|t| TopicEntry {
                score: score(t.occurrences, t.sources.len()),
                keyword: t.keyword,
                normalized: t.normalized,
                occurrences: t.occurrences,
                sources: t.sources.into_iter().collect(),
            })
            .collect();

        rank(&mut entries);
        entries
    }
}

/// Sort by score, then occurrences, both descending. The sort is stable, so
/// remaining ties keep their current (first-seen) order.
pub fn rank(entries: &mut [TopicEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.occurrences.cmp(&a.occurrences))
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    People,
    Politics,
    Cinema,
    Geo,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::People,
        Category::Politics,
        Category::Cinema,
        Category::Geo,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::People => "people",
            Category::Politics => "politics",
            Category::Cinema => "cinema",
            Category::Geo => "geo",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn looks_like_person(keyword: &str) -> bool {
    keyword.split(' ').filter(|t| !t.is_empty()).count() >= 2
        && keyword.chars().next().is_some_and(char::is_uppercase)
}

/// First matching bucket, in priority order people, politics, cinema, geo.
/// Anything else, short fragments included, lands in `other`.
pub fn categorize(keyword: &str, normalized: &str, lexicon: &Lexicon) -> Category {
    if looks_like_person(keyword) || lexicon.is_known_person(normalized) {
        Category::People
    } else if lexicon.mentions_politics(normalized) {
        Category::Politics
    } else if lexicon.mentions_cinema(normalized) {
        Category::Cinema
    } else if lexicon.mentions_place(normalized) {
        Category::Geo
    } else {
        Category::Other
    }
}

/// Best keyword of each category, `None` when nothing qualified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopByCategory {
    pub people: Option<String>,
    pub politics: Option<String>,
    pub cinema: Option<String>,
    pub geo: Option<String>,
    pub other: Option<String>,
}

impl TopByCategory {
    /// Single pass over a ranked list; each slot is filled once and never
    /// overwritten.
    pub fn from_ranked(entries: &[TopicEntry], lexicon: &Lexicon) -> Self {
        let mut top = Self::default();
        for entry in entries {
            let slot = top.slot_mut(categorize(&entry.keyword, &entry.normalized, lexicon));
            if slot.is_none() {
                *slot = Some(entry.keyword.clone());
            }
        }
        top
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        match category {
            Category::People => self.people.as_deref(),
            Category::Politics => self.politics.as_deref(),
            Category::Cinema => self.cinema.as_deref(),
            Category::Geo => self.geo.as_deref(),
            Category::Other => self.other.as_deref(),
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Option<String> {
        match category {
            Category::People => &mut self.people,
            Category::Politics => &mut self.politics,
            Category::Cinema => &mut self.cinema,
            Category::Geo => &mut self.geo,
            Category::Other => &mut self.other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub all: Vec<TopicEntry>,
    pub top: Vec<TopicEntry>,
    pub top_by_category: TopByCategory,
}

impl Ranking {
    /// Cap a ranked list to `all_limit`, take the first `top_limit` and fill
    /// the category slots from the capped list.
    pub fn build(
        mut ranked: Vec<TopicEntry>,
        all_limit: usize,
        top_limit: usize,
        lexicon: &Lexicon,
    ) -> Self {
        ranked.truncate(all_limit);
        let top = ranked.iter().take(top_limit).cloned().collect();
        let top_by_category = TopByCategory::from_ranked(&ranked, lexicon);

        Self {
            all: ranked,
            top,
            top_by_category,
        }
    }
}
