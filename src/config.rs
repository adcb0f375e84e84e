use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::vocabulary::Vocabulary;

/// Config file read when `POEM_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "poem.toml";

/// Feeds used when the configuration does not list any.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
    ("Reuters", "https://www.reuters.com/rssFeed/topNews"),
    (
        "New York Times",
        "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
    ),
    ("Le Monde", "https://www.lemonde.fr/rss/une.xml"),
    ("Le Figaro", "https://www.lefigaro.fr/rss/figaro_actualites.xml"),
    ("France 24", "https://www.france24.com/fr/rss"),
    (
        "Google News FR",
        "https://news.google.com/rss?hl=fr&gl=FR&ceid=FR:fr",
    ),
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Timezone the poem calendar follows
    #[serde(
        default = "default_timezone",
        deserialize_with = "deserialize_timezone"
    )]
    pub timezone: Tz,
    /// Local hours during which the daily poem may be rotated
    #[serde(default = "default_publish_hours")]
    pub publish_hours: Vec<u32>,
    /// Background rotation check interval in minutes
    #[serde(default = "default_rotation_check_minutes")]
    pub rotation_check_minutes: u64,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub poem: PoemConfig,
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Paris
}

fn default_publish_hours() -> Vec<u32> {
    vec![15, 16]
}

fn default_rotation_check_minutes() -> u64 {
    10
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.parse::<Tz>()
        .map_err(|e| serde::de::Error::custom(format!("unknown timezone '{}': {}", name, e)))
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TopicsConfig {
    pub max_per_feed: usize,
    pub fetch_timeout_secs: u64,
    /// Ceiling on the ranked "all" list
    pub all_limit: usize,
    pub top_limit: usize,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            max_per_feed: 20,
            fetch_timeout_secs: 15,
            all_limit: 200,
            top_limit: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoemConfig {
    /// Number of keywords woven into the poem
    pub word_count: usize,
    pub model: String,
    pub api_base: String,
}

impl Default for PoemConfig {
    fn default() -> Self {
        Self {
            word_count: 5,
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            publish_hours: default_publish_hours(),
            rotation_check_minutes: default_rotation_check_minutes(),
            topics: TopicsConfig::default(),
            feeds: Vec::new(),
            poem: PoemConfig::default(),
            vocabulary: Vocabulary::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load `path` if it exists, or fall back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            info!("No configuration file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// The file named by `POEM_CONFIG`, else `poem.toml`, else the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var("POEM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(path)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(hour) = self.publish_hours.iter().find(|h| **h > 23) {
            anyhow::bail!("publish hour {} is out of range", hour);
        }
        if self.topics.max_per_feed == 0 {
            anyhow::bail!("topics.max_per_feed must be positive");
        }
        if self.topics.all_limit == 0 {
            anyhow::bail!("topics.all_limit must be positive");
        }
        if self.topics.top_limit == 0 {
            anyhow::bail!("topics.top_limit must be positive");
        }
        if self.rotation_check_minutes == 0 {
            anyhow::bail!("rotation_check_minutes must be positive");
        }
        Ok(())
    }

    /// Configured feed URLs, or the built-in defaults when none are listed.
    pub fn feed_urls(&self) -> Vec<String> {
        if self.feeds.is_empty() {
            DEFAULT_FEEDS.iter().map(|(_, url)| url.to_string()).collect()
        } else {
            self.feeds.iter().map(|f| f.url.clone()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_publish_hours(), vec![15, 16]);
        assert_eq!(default_timezone(), chrono_tz::Europe::Paris);

        let config = Config::default();
        assert_eq!(config.topics.max_per_feed, 20);
        assert_eq!(config.topics.fetch_timeout_secs, 15);
        assert_eq!(config.topics.all_limit, 200);
        assert_eq!(config.topics.top_limit, 10);
        assert_eq!(config.poem.word_count, 5);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            timezone = "America/New_York"
            publish_hours = [9]

            [topics]
            max_per_feed = 5
            fetch_timeout_secs = 3

            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"

            [[feeds]]
            name = "Another Feed"
            url = "https://example.org/rss"

            [poem]
            word_count = 3
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.publish_hours, vec![9]);
        assert_eq!(config.topics.max_per_feed, 5);
        assert_eq!(config.topics.fetch_timeout_secs, 3);
        assert_eq!(config.topics.all_limit, 200); // Default value
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].name, "Test Feed");
        assert_eq!(config.feeds[1].url, "https://example.org/rss");
        assert_eq!(config.poem.word_count, 3);
        assert_eq!(config.poem.model, "gpt-4o-mini");
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        for content in [
            "[topics]\nall_limit = 0",
            "[topics]\ntop_limit = 0",
            "[topics]\nmax_per_feed = 0",
        ] {
            let err = Config::from_str(content).unwrap_err();
            assert!(err.to_string().contains("must be positive"), "{}", err);
        }
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let config = Config::load_or_default(&missing).unwrap();
        assert!(config.feeds.is_empty());

        let present = dir.path().join("poem.toml");
        std::fs::write(&present, "rotation_check_minutes = 3").unwrap();
        let config = Config::load_or_default(&present).unwrap();
        assert_eq!(config.rotation_check_minutes, 3);

        std::fs::write(&present, "rotation_check_minutes = \"often\"").unwrap();
        assert!(Config::load_or_default(&present).is_err());
    }

    #[test]
    fn test_empty_config_uses_default_feeds() {
        let config = Config::from_str("").unwrap();

        assert!(config.feeds.is_empty());
        let urls = config.feed_urls();
        assert_eq!(urls.len(), DEFAULT_FEEDS.len());
        assert!(urls.contains(&"https://www.lemonde.fr/rss/une.xml".to_string()));
    }

    #[test]
    fn test_configured_feeds_replace_defaults() {
        let content = r#"
            [[feeds]]
            name = "Only"
            url = "https://only.example.com/rss"
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.feed_urls(), vec!["https://only.example.com/rss"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/poem.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let result = Config::from_str(r#"timezone = "Mars/Olympus_Mons""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_feed_url_is_rejected() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
            # Missing url field
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_out_of_range_publish_hour_is_rejected() {
        assert!(Config::from_str("publish_hours = [24]").is_err());
    }

    #[test]
    fn test_zero_max_per_feed_is_rejected() {
        let content = r#"
            [topics]
            max_per_feed = 0
        "#;
        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_vocabulary_override_replaces_single_list() {
        let content = r#"
            [vocabulary]
            cinema = ["documentaire"]
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.vocabulary.cinema, vec!["documentaire"]);
        // Other lists keep their built-in values
        assert!(config.vocabulary.politics.iter().any(|w| w == "ministre"));
    }
}
