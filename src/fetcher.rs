use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use futures::future::join_all;
use regex::{Captures, Regex};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

/// Text of one feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub content: String,
}

/// Diagnostics for a single feed fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDebug {
    pub url: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub took_ms: u64,
    pub bytes: usize,
    pub parsed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedDebug {
    fn new(url: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            started_at,
            status: None,
            took_ms: 0,
            bytes: 0,
            parsed_count: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of fetching one feed. Failed feeds carry no items.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub url: String,
    pub items: Vec<FeedItem>,
    pub debug: FeedDebug,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unparsable feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; RSS-Topic-Bot/1.0)")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch every feed concurrently. Results keep the order of `urls`; blank
    /// URLs are skipped.
    pub async fn fetch_all(&self, urls: &[String], max_per_feed: usize) -> Vec<FetchedFeed> {
        let jobs = urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(|url| self.fetch_feed(url, max_per_feed));

        join_all(jobs).await
    }

    /// Fetch and parse one feed. Never fails: any error leaves the feed
    /// without items and is recorded in its [`FeedDebug`].
    pub async fn fetch_feed(&self, url: &str, max_per_feed: usize) -> FetchedFeed {
        let mut debug = FeedDebug::new(url, Utc::now());
        let start = Instant::now();

        let result = self.fetch_items(url, max_per_feed, &mut debug).await;
        let took_ms = start.elapsed().as_millis() as u64;
        debug.took_ms = took_ms;

        let items = match result {
            Ok(items) => {
                info!(
                    "Fetched {} items from {} in {}ms",
                    items.len(),
                    url,
                    took_ms
                );
                items
            }
            Err(e) => {
                warn!("Failed to fetch feed '{}': {}", url, e);
                debug.error = Some(e.to_string());
                Vec::new()
            }
        };
        debug.parsed_count = items.len();

        FetchedFeed {
            url: url.to_string(),
            items,
            debug,
        }
    }

    async fn fetch_items(
        &self,
        url: &str,
        max_per_feed: usize,
        debug: &mut FeedDebug,
    ) -> Result<Vec<FeedItem>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug.status = Some(status.as_u16());
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        debug.bytes = bytes.len();

        Self::parse_items(&bytes, max_per_feed)
    }

    /// Parse an RSS/Atom document into at most `max_per_feed` items.
    pub fn parse_items(bytes: &[u8], max_per_feed: usize) -> Result<Vec<FeedItem>, FetchError> {
        let parsed = parser::parse(bytes)?;

        Ok(parsed
            .entries
            .iter()
            .take(max_per_feed)
            .map(Self::entry_item)
            .collect())
    }

    /// Title plus the best available body: the content (tags stripped), or
    /// else the summary.
    pub fn entry_item(entry: &Entry) -> FeedItem {
        let title = entry
            .title
            .as_ref()
            .map(|t| collapse(&decode_entities(&t.content)))
            .unwrap_or_default();

        let body = entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .filter(|b| !b.trim().is_empty())
            .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()));

        FeedItem {
            title,
            content: body.map(|b| strip_html(&b)).unwrap_or_default(),
        }
    }
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        "laquo" => '«',
        "raquo" => '»',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "eacute" => 'é',
        "egrave" => 'è',
        "ecirc" => 'ê',
        "agrave" => 'à',
        "ccedil" => 'ç',
        "ocirc" => 'ô',
        "Eacute" => 'É',
        _ => return None,
    };
    Some(c)
}

/// Decode numeric character references and common named entities in one
/// pass. Unknown or invalid references are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        let decoded = match name.strip_prefix('#') {
            Some(number) => {
                let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            }
            None => named_entity(name),
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of an HTML fragment.
pub fn strip_html(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    collapse(&decode_entities(&text))
}
