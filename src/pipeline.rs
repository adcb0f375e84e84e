//! Feeds in, ranked and categorized topics out.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::info;

use crate::calendar::{format_date, today_in};
use crate::config::{Config, TopicsConfig};
use crate::fetcher::{FeedDebug, FetchedFeed, Fetcher};
use crate::topics::{Ranking, TopByCategory, TopicAggregator, TopicEntry};
use crate::vocabulary::Lexicon;

/// Per-call overrides of the configured feed list and item cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicsRequest {
    pub feeds: Option<Vec<String>>,
    pub max_per_feed: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsReport {
    pub date: String,
    pub all: Vec<TopicEntry>,
    pub top: Vec<TopicEntry>,
    pub top_by_category: TopByCategory,
    pub feed_debug: Vec<FeedDebug>,
}

pub struct TopicExtractor {
    fetcher: Fetcher,
    lexicon: Lexicon,
    settings: TopicsConfig,
    default_feeds: Vec<String>,
    timezone: Tz,
}

impl TopicExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            fetcher: Fetcher::new(Duration::from_secs(config.topics.fetch_timeout_secs)),
            lexicon: config.vocabulary.lexicon(),
            settings: config.topics.clone(),
            default_feeds: config.feed_urls(),
            timezone: config.timezone,
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Fetch the requested feeds (or the configured ones) and rank their
    /// topics. Feed failures only show up in `feed_debug`.
    pub async fn extract(&self, request: &TopicsRequest) -> TopicsReport {
        let feeds = request
            .feeds
            .clone()
            .filter(|feeds| !feeds.is_empty())
            .unwrap_or_else(|| self.default_feeds.clone());
        let max_per_feed = request
            .max_per_feed
            .unwrap_or(self.settings.max_per_feed)
            .max(1);

        let fetched = self.fetcher.fetch_all(&feeds, max_per_feed).await;
        let report = self.aggregate(today_in(self.timezone), fetched);

        let failed = report.feed_debug.iter().filter(|d| !d.succeeded()).count();
        info!(
            "Extracted {} topics from {} feeds ({} failed)",
            report.all.len(),
            report.feed_debug.len(),
            failed
        );
        report
    }

    /// Rank the topics of already fetched feeds, in the order given.
    pub fn aggregate(&self, date: NaiveDate, fetched: Vec<FetchedFeed>) -> TopicsReport {
        let mut aggregator = TopicAggregator::new(&self.lexicon);
        for feed in &fetched {
            aggregator.add_feed(&feed.url, &feed.items);
        }

        let ranking = Ranking::build(
            aggregator.ranked(),
            self.settings.all_limit,
            self.settings.top_limit,
            &self.lexicon,
        );

        TopicsReport {
            date: format_date(date),
            all: ranking.all,
            top: ranking.top,
            top_by_category: ranking.top_by_category,
            feed_debug: fetched.into_iter().map(|f| f.debug).collect(),
        }
    }
}
