//! Poem of the day: keyword selection, the template poem, HTML rendering and
//! the service that ties topics, writer and storage together.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::calendar::{format_date, in_publish_window, today_in, window_start};
use crate::config::Config;
use crate::db::{Database, StoredPoem};
use crate::pipeline::{TopicExtractor, TopicsReport, TopicsRequest};
use crate::topics::TopicEntry;
use crate::writer::{PoemRequest, PoemWriter};

pub const DEFAULT_WORD_COUNT: usize = 5;
pub const MAX_WORD_COUNT: usize = 8;

/// Used, in order, when the topics do not provide enough keywords.
pub const FALLBACK_WORDS: [&str; 5] = ["Paris", "pluie", "minuit", "danse", "Seine"];

/// Clamp a requested keyword count to `1..=8`.
pub fn clamp_word_count(requested: i64) -> usize {
    requested.clamp(1, MAX_WORD_COUNT as i64) as usize
}

/// Keywords of `top` in rank order, deduplicated case-insensitively and padded
/// with [`FALLBACK_WORDS`].
pub fn select_words(top: &[TopicEntry], count: usize) -> Vec<String> {
    let count = count.clamp(1, MAX_WORD_COUNT);
    let mut seen = std::collections::HashSet::new();
    let mut words = Vec::with_capacity(count);

    let keywords = top.iter().map(|e| e.keyword.as_str());
    for word in keywords.chain(FALLBACK_WORDS) {
        if words.len() == count {
            break;
        }
        let key = word.trim().to_lowercase();
        if !key.is_empty() && seen.insert(key) {
            words.push(word.trim().to_string());
        }
    }

    words
}

/// First character uppercased, the rest untouched.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Jean Castex` → `#Jean_Castex`. Blank input gives an empty string.
pub fn hashtagify(word: &str) -> String {
    let word = word.trim();
    if word.is_empty() {
        return String::new();
    }
    let joined = word.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("#{}", kept)
}

/// Hashtags of every word that yields one.
pub fn hashtags(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| hashtagify(w))
        .filter(|h| h.len() > 1)
        .collect()
}

/// Fourteen lines of free verse around the first five words, then the
/// hashtag line.
pub fn template_poem(words: &[String]) -> String {
    let word = |i: usize, default: &str| -> String {
        words
            .get(i)
            .map(|w| capitalize(w.trim()))
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let lines = [
        format!("Sous les balcons, je murmure {} comme un serment furtif.", word(2, "la ville")),
        format!("{} se reflète dans les flaques où tremble {}.", word(1, "La pluie"), word(2, "la ville")),
        format!("Je trace {} sur la buée des vitres encore tièdes.", word(1, "la pluie")),
        format!("Une ombre respire {} au détour des quais assoupis.", word(3, "la danse")),
        format!("Dans le vent, je retiens {} pour qu'il ne s'efface pas.", word(4, "minuit")),
        "La Seine transporte des secrets de velours.".to_string(),
        "Je compte les fenêtres qui palpitent encore.".to_string(),
        "Je marche avec l'ombre lente des réverbères.".to_string(),
        format!("{} clignote comme un néon cassé dans la vitrine des nouvelles.", word(0, "Un nom")),
        format!("Le monde déplie un {} froissé qui parle en braille.", word(3, "plan")),
        format!("Je range {} dans le placard à jouets détraqués.", word(0, "le vacarme")),
        format!("Je rince {} dans ma gorge, sel et fer, et je recommence.", word(1, "la pluie")),
        format!("Toi, {}, change de peau à chaque météo.", word(2, "Paris")),
        "Que la nuit nous emprunte seulement ce qu'elle rend.".to_string(),
    ];

    let tags = hashtags(words);
    let tags = if tags.is_empty() {
        "#poème".to_string()
    } else {
        tags.join(" ")
    };

    format!("{}\n\nHashtags : {}", lines.join("\n"), tags)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One `<p>` per line; blank lines become `<p>&nbsp;</p>`.
pub fn poem_to_html(poem: &str) -> String {
    poem.split('\n')
        .map(|line| {
            let content = escape_html(line.trim_end());
            if content.is_empty() {
                "<p>&nbsp;</p>".to_string()
            } else {
                format!("<p>{}</p>", content)
            }
        })
        .collect()
}

/// The first `limit` ranked entries, or `top` when no limit is given.
pub fn keyword_pool(report: &TopicsReport, limit: Option<usize>) -> &[TopicEntry] {
    match limit {
        Some(limit) => &report.all[..limit.min(report.all.len())],
        None => &report.top,
    }
}

/// What the front page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPoem {
    pub html: String,
    pub published_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl From<&StoredPoem> for LatestPoem {
    fn from(poem: &StoredPoem) -> Self {
        Self {
            html: poem_to_html(&poem.poem),
            published_at: poem.published_at,
            generated_at: poem.generated_at,
        }
    }
}

/// An unsaved poem built from live topics.
#[derive(Debug, Clone, Serialize)]
pub struct PoemDraft {
    pub date: String,
    pub words: Vec<String>,
    pub poem: String,
    #[serde(skip)]
    pub report: TopicsReport,
}

/// How a generation treats an existing poem and when the new one shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Replace the date's poem if there is one
    pub force: bool,
    /// Publish immediately instead of at the start of the publish window
    pub visible: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            force: false,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Created(StoredPoem),
    Exists(StoredPoem),
    /// A forced generation overwrote the date's poem
    Replaced(StoredPoem),
    /// Another generation was already running
    InProgress,
}

impl Generation {
    pub fn status(&self) -> &'static str {
        match self {
            Generation::Created(_) => "created",
            Generation::Exists(_) => "exists",
            Generation::Replaced(_) => "replaced",
            Generation::InProgress => "in_progress",
        }
    }

    pub fn poem(&self) -> Option<&StoredPoem> {
        match self {
            Generation::Created(poem)
            | Generation::Exists(poem)
            | Generation::Replaced(poem) => Some(poem),
            Generation::InProgress => None,
        }
    }
}

pub struct PoemService {
    db: Arc<Database>,
    extractor: TopicExtractor,
    writer: Arc<dyn PoemWriter>,
    timezone: Tz,
    publish_hours: Vec<u32>,
    word_count: usize,
    generating: Arc<RwLock<bool>>,
}

impl PoemService {
    pub fn new(db: Arc<Database>, config: &Config, writer: Arc<dyn PoemWriter>) -> Self {
        Self {
            db,
            extractor: TopicExtractor::new(config),
            writer,
            timezone: config.timezone,
            publish_hours: config.publish_hours.clone(),
            word_count: config.poem.word_count.clamp(1, MAX_WORD_COUNT),
            generating: Arc::new(RwLock::new(false)),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn extractor(&self) -> &TopicExtractor {
        &self.extractor
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn today(&self) -> NaiveDate {
        today_in(self.timezone)
    }

    pub fn in_publish_window(&self, now: DateTime<Utc>) -> bool {
        in_publish_window(now, self.timezone, &self.publish_hours)
    }

    pub async fn is_generating(&self) -> bool {
        *self.generating.read().await
    }

    pub async fn generate_today(&self) -> anyhow::Result<Generation> {
        self.generate_for(self.today()).await
    }

    /// Make sure `date` has a poem. Nothing is rewritten when one exists.
    pub async fn generate_for(&self, date: NaiveDate) -> anyhow::Result<Generation> {
        self.generate_with(date, GenerateOptions::default()).await
    }

    pub async fn generate_with(
        &self,
        date: NaiveDate,
        options: GenerateOptions,
    ) -> anyhow::Result<Generation> {
        let day = format_date(date);
        let replacing = match self.db.get_poem(&day).await? {
            Some(existing) if !options.force => return Ok(Generation::Exists(existing)),
            Some(_) => true,
            None => false,
        };

        {
            let mut generating = self.generating.write().await;
            if *generating {
                info!("Poem generation already in progress, skipping");
                return Ok(Generation::InProgress);
            }
            *generating = true;
        }

        let result = self.do_generate(date, options, replacing).await;

        {
            let mut generating = self.generating.write().await;
            *generating = false;
        }

        result
    }

    /// When a poem generated at `now` for `date` becomes visible.
    pub fn publication_time(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
        visible: bool,
    ) -> DateTime<Utc> {
        if visible {
            return now;
        }
        window_start(date, self.timezone, &self.publish_hours)
            .map(|at| at.trunc_subsecs(3))
            .unwrap_or(now)
    }

    async fn do_generate(
        &self,
        date: NaiveDate,
        options: GenerateOptions,
        replacing: bool,
    ) -> anyhow::Result<Generation> {
        let day = format_date(date);
        let report = self.extractor.extract(&TopicsRequest::default()).await;
        if report.top.is_empty() {
            warn!("No topics available for {}, using fallback words", day);
        }
        let words = select_words(&report.top, self.word_count);

        let request = PoemRequest { date: day, words };
        let text = self.writer.write(&request).await?;

        let now = Utc::now().trunc_subsecs(3);
        let poem = StoredPoem {
            date: request.date.clone(),
            poem: text,
            hashtags: request.hashtags(),
            words: request.words,
            writer: self.writer.name().to_string(),
            generated_at: now,
            published_at: self.publication_time(date, now, options.visible),
        };

        if options.force {
            self.db.upsert_poem(&poem).await?;
            info!(
                "Stored poem for {} written by {}, published at {}{}",
                poem.date,
                poem.writer,
                poem.published_at,
                if replacing { " (replaced)" } else { "" }
            );
            return Ok(if replacing {
                Generation::Replaced(poem)
            } else {
                Generation::Created(poem)
            });
        }

        if self.db.insert_poem_if_absent(&poem).await? {
            info!(
                "Stored poem for {} written by {} ({} words)",
                poem.date,
                poem.writer,
                poem.words.len()
            );
            return Ok(Generation::Created(poem));
        }

        match self.db.get_poem(&poem.date).await? {
            Some(existing) => Ok(Generation::Exists(existing)),
            None => anyhow::bail!("poem for {} vanished after insert conflict", poem.date),
        }
    }

    /// Topics, keywords and the template poem for today, without storing
    /// anything. `limit` widens or narrows the ranked list keywords are
    /// drawn from, which is `top` by default.
    pub async fn preview(
        &self,
        request: &TopicsRequest,
        count: usize,
        limit: Option<usize>,
    ) -> PoemDraft {
        let report = self.extractor.extract(request).await;
        let words = select_words(keyword_pool(&report, limit), count);
        let poem = template_poem(&words);

        PoemDraft {
            date: report.date.clone(),
            words,
            poem,
            report,
        }
    }

    pub async fn latest(&self, now: DateTime<Utc>) -> anyhow::Result<Option<LatestPoem>> {
        let poem = self.db.latest_poem_before(now).await?;
        Ok(poem.as_ref().map(LatestPoem::from))
    }
}

/// Generate today's poem whenever a check falls inside the publish window.
pub async fn start_daily_rotation(service: Arc<PoemService>, check_minutes: u64) {
    let interval = Duration::from_secs(check_minutes * 60);

    info!(
        "Starting daily rotation, checking every {} minutes",
        check_minutes
    );
    loop {
        if service.in_publish_window(Utc::now()) {
            match service.generate_today().await {
                Ok(generation) => {
                    if let Generation::Created(poem) = &generation {
                        info!("Rotated poem of the day to {}", poem.date);
                    }
                }
                Err(e) => error!("Scheduled poem generation failed: {}", e),
            }
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{TemplateWriter, WriterError};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn entry(keyword: &str) -> TopicEntry {
        TopicEntry {
            keyword: keyword.to_string(),
            normalized: keyword.to_lowercase(),
            occurrences: 1,
            sources: vec!["feed".to_string()],
            score: 1.0,
        }
    }

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_takes_top_keywords_in_order() {
            let top = vec![entry("Macron"), entry("Paris"), entry("grève")];
            assert_eq!(select_words(&top, 2), vec!["Macron", "Paris"]);
        }

        #[test]
        fn test_dedupes_case_insensitively() {
            let top = vec![entry("Paris"), entry("PARIS"), entry(" paris "), entry("Seine")];
            assert_eq!(select_words(&top, 2), vec!["Paris", "Seine"]);
        }

        #[test]
        fn test_pads_with_fallback_words() {
            let top = vec![entry("Macron"), entry("Paris")];
            assert_eq!(
                select_words(&top, 5),
                vec!["Macron", "Paris", "pluie", "minuit", "danse"]
            );
        }

        #[test]
        fn test_empty_topics_give_fallback_words() {
            assert_eq!(select_words(&[], 5), strings(&FALLBACK_WORDS));
        }

        #[test]
        fn test_count_is_clamped() {
            let top: Vec<TopicEntry> = (0..12).map(|i| entry(&format!("mot{}", i))).collect();
            assert_eq!(select_words(&top, 0).len(), 1);
            assert_eq!(select_words(&top, 20).len(), 8);
            assert_eq!(clamp_word_count(-3), 1);
            assert_eq!(clamp_word_count(5), 5);
            assert_eq!(clamp_word_count(99), 8);
        }
    }

    mod pool_tests {
        use super::*;
        use crate::topics::TopByCategory;

        fn report() -> TopicsReport {
            let all = vec![entry("Macron"), entry("Paris"), entry("grève"), entry("Cannes")];
            TopicsReport {
                date: "2025-03-14".to_string(),
                top: all[..2].to_vec(),
                all,
                top_by_category: TopByCategory::default(),
                feed_debug: Vec::new(),
            }
        }

        #[test]
        fn test_pool_defaults_to_top() {
            let report = report();
            assert_eq!(keyword_pool(&report, None), &report.top[..]);
        }

        #[test]
        fn test_limit_slices_ranked_list() {
            let report = report();
            assert_eq!(keyword_pool(&report, Some(1)), &report.all[..1]);
            assert_eq!(keyword_pool(&report, Some(3)).len(), 3);
            assert_eq!(keyword_pool(&report, Some(100)), &report.all[..]);

            let words = select_words(keyword_pool(&report, Some(1)), 3);
            assert_eq!(words, vec!["Macron", "Paris", "pluie"]);
        }
    }

    mod template_tests {
        use super::*;

        #[test]
        fn test_hashtagify() {
            assert_eq!(hashtagify("Jean  Castex"), "#Jean_Castex");
            assert_eq!(hashtagify("Élysée!"), "#Élysée");
            assert_eq!(hashtagify("l'Assemblée"), "#lAssemblée");
            assert_eq!(hashtagify("   "), "");
        }

        #[test]
        fn test_capitalize() {
            assert_eq!(capitalize("pluie"), "Pluie");
            assert_eq!(capitalize("élysée"), "Élysée");
            assert_eq!(capitalize(""), "");
        }

        #[test]
        fn test_template_has_fourteen_lines_and_hashtags() {
            let words = strings(&["Macron", "pluie", "Paris", "grève", "minuit"]);
            let poem = template_poem(&words);
            let (verses, tags) = poem.split_once("\n\n").unwrap();

            assert_eq!(verses.lines().count(), 14);
            assert_eq!(tags, "Hashtags : #Macron #pluie #Paris #grève #minuit");
            assert!(verses.starts_with("Sous les balcons, je murmure Paris comme"));
            assert!(verses.contains("Pluie se reflète dans les flaques"));
            assert!(verses.contains("Toi, Paris, change de peau"));
        }

        #[test]
        fn test_template_defaults_for_missing_words() {
            let poem = template_poem(&[]);
            assert!(poem.starts_with("Sous les balcons, je murmure la ville comme"));
            assert!(poem.contains("Un nom clignote"));
            assert!(poem.ends_with("Hashtags : #poème"));
        }

        #[test]
        fn test_poem_to_html() {
            let html = poem_to_html("Premier <vers>  \n\nTom & \"Jerry\"");
            assert_eq!(
                html,
                "<p>Premier &lt;vers&gt;</p><p>&nbsp;</p><p>Tom &amp; &quot;Jerry&quot;</p>"
            );
        }

        #[test]
        fn test_latest_view_from_stored_poem() {
            let now = Utc::now();
            let stored = StoredPoem {
                date: "2025-03-14".to_string(),
                poem: "Un\nDeux".to_string(),
                words: Vec::new(),
                hashtags: Vec::new(),
                writer: "template".to_string(),
                generated_at: now,
                published_at: now,
            };
            let latest = LatestPoem::from(&stored);
            assert_eq!(latest.html, "<p>Un</p><p>Deux</p>");
            let json = serde_json::to_value(&latest).unwrap();
            assert!(json.get("publishedAt").is_some());
            assert!(json.get("generatedAt").is_some());
        }
    }

    mod service_tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingWriter {
            calls: AtomicUsize,
            delay: Duration,
        }

        #[async_trait]
        impl PoemWriter for CountingWriter {
            fn name(&self) -> &str {
                "counting"
            }

            async fn write(&self, request: &PoemRequest) -> Result<String, WriterError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                Ok(request.words.join(" / "))
            }
        }

        struct FailingWriter;

        #[async_trait]
        impl PoemWriter for FailingWriter {
            fn name(&self) -> &str {
                "failing"
            }

            async fn write(&self, _request: &PoemRequest) -> Result<String, WriterError> {
                Err(WriterError::InvalidResponse("no poem".to_string()))
            }
        }

        // A single unreachable feed keeps the tests offline and fast.
        fn offline_config() -> Config {
            Config::from_str(
                r#"
                [topics]
                fetch_timeout_secs = 1

                [[feeds]]
                name = "Offline"
                url = "http://127.0.0.1:9/rss"
            "#,
            )
            .unwrap()
        }

        async fn create_service(writer: Arc<dyn PoemWriter>) -> PoemService {
            let db = Database::new("sqlite::memory:").await.unwrap();
            db.initialize().await.unwrap();
            PoemService::new(Arc::new(db), &offline_config(), writer)
        }

        fn date() -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        }

        #[tokio::test]
        async fn test_generate_creates_then_exists() {
            let writer = Arc::new(CountingWriter {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            });
            let service = create_service(writer.clone()).await;

            let first = service.generate_for(date()).await.unwrap();
            let created = match &first {
                Generation::Created(poem) => poem.clone(),
                other => panic!("expected created, got {:?}", other),
            };
            assert_eq!(created.date, "2025-03-14");
            assert_eq!(created.words, strings(&FALLBACK_WORDS));
            assert_eq!(created.poem, "Paris / pluie / minuit / danse / Seine");
            assert_eq!(created.hashtags[0], "#Paris");
            assert_eq!(created.writer, "counting");

            let second = service.generate_for(date()).await.unwrap();
            assert_eq!(second, Generation::Exists(created));
            assert_eq!(second.status(), "exists");
            assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_concurrent_generation_reports_in_progress() {
            let writer = Arc::new(CountingWriter {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(300),
            });
            let service = Arc::new(create_service(writer.clone()).await);

            let running = {
                let service = service.clone();
                tokio::spawn(async move { service.generate_for(date()).await })
            };
            while !service.is_generating().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            let second = service.generate_for(date()).await.unwrap();
            assert_eq!(second, Generation::InProgress);

            let first = running.await.unwrap().unwrap();
            assert_eq!(first.status(), "created");
            assert!(!service.is_generating().await);
            assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_writer_failure_stores_nothing_and_clears_guard() {
            let service = create_service(Arc::new(FailingWriter)).await;

            assert!(service.generate_for(date()).await.is_err());
            assert!(!service.is_generating().await);
            assert!(service.db().get_poem("2025-03-14").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_forced_generation_replaces_poem() {
            let writer = Arc::new(CountingWriter {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            });
            let service = create_service(writer.clone()).await;
            let forced = GenerateOptions {
                force: true,
                visible: true,
            };

            let first = service.generate_with(date(), forced).await.unwrap();
            assert_eq!(first.status(), "created");

            let second = service.generate_with(date(), forced).await.unwrap();
            assert_eq!(second.status(), "replaced");
            assert_eq!(writer.calls.load(Ordering::SeqCst), 2);

            let stored = service.db().get_poem("2025-03-14").await.unwrap();
            assert_eq!(stored.as_ref(), second.poem());
            assert_eq!(service.db().list_poems().await.unwrap().len(), 1);

            let unforced = service.generate_for(date()).await.unwrap();
            assert_eq!(unforced.status(), "exists");
            assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_hidden_poem_waits_for_publish_window() {
            let service = create_service(Arc::new(TemplateWriter)).await;
            let future = NaiveDate::from_ymd_opt(2099, 1, 15).unwrap();

            let generation = service
                .generate_with(
                    future,
                    GenerateOptions {
                        force: false,
                        visible: false,
                    },
                )
                .await
                .unwrap();
            let poem = generation.poem().unwrap();
            // 15h in Paris winter time
            assert_eq!(
                poem.published_at,
                Utc.with_ymd_and_hms(2099, 1, 15, 14, 0, 0).unwrap()
            );
            assert!(poem.generated_at < poem.published_at);
            assert!(service.latest(Utc::now()).await.unwrap().is_none());
            assert!(service
                .latest(poem.published_at)
                .await
                .unwrap()
                .is_some());
        }

        #[tokio::test]
        async fn test_visible_poem_is_published_now() {
            let service = create_service(Arc::new(TemplateWriter)).await;
            let before = Utc::now().trunc_subsecs(3);

            let generation = service
                .generate_with(date(), GenerateOptions::default())
                .await
                .unwrap();
            let poem = generation.poem().unwrap();
            assert_eq!(poem.published_at, poem.generated_at);
            assert!(poem.published_at >= before);
            assert!(service.latest(Utc::now()).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn test_preview_stores_nothing() {
            let service = create_service(Arc::new(TemplateWriter)).await;

            let draft = service.preview(&TopicsRequest::default(), 3, None).await;
            assert_eq!(draft.words, vec!["Paris", "pluie", "minuit"]);
            assert!(draft.poem.ends_with("Hashtags : #Paris #pluie #minuit"));
            assert_eq!(draft.report.feed_debug.len(), 1);
            assert!(service.db().list_poems().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_latest_uses_published_poems_only() {
            let service = create_service(Arc::new(TemplateWriter)).await;
            assert!(service.latest(Utc::now()).await.unwrap().is_none());

            service.generate_for(date()).await.unwrap();
            let latest = service.latest(Utc::now()).await.unwrap().unwrap();
            assert!(latest.html.starts_with("<p>Sous les balcons"));
        }
    }
}
