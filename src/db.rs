use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

/// One poem per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPoem {
    /// `YYYY-MM-DD` in the configured timezone
    pub date: String,
    pub poem: String,
    pub words: Vec<String>,
    pub hashtags: Vec<String>,
    /// Name of the writer that produced the text
    pub writer: String,
    pub generated_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PoemRow {
    date: String,
    poem: String,
    words: String,
    hashtags: String,
    writer: String,
    generated_at: String,
    published_at: String,
}

impl TryFrom<PoemRow> for StoredPoem {
    type Error = anyhow::Error;

    fn try_from(row: PoemRow) -> anyhow::Result<Self> {
        Ok(Self {
            date: row.date,
            poem: row.poem,
            words: serde_json::from_str(&row.words)?,
            hashtags: serde_json::from_str(&row.hashtags)?,
            writer: row.writer,
            generated_at: parse_timestamp(&row.generated_at)?,
            published_at: parse_timestamp(&row.published_at)?,
        })
    }
}

// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(text: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poems (
                date TEXT PRIMARY KEY,
                poem TEXT NOT NULL,
                words TEXT NOT NULL DEFAULT '[]',
                hashtags TEXT NOT NULL DEFAULT '[]',
                writer TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                published_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_poems_published
            ON poems(published_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store `poem` unless its date already has one. Returns whether a row
    /// was written.
    pub async fn insert_poem_if_absent(&self, poem: &StoredPoem) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO poems (date, poem, words, hashtags, writer, generated_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date) DO NOTHING
            "#,
        )
        .bind(&poem.date)
        .bind(&poem.poem)
        .bind(serde_json::to_string(&poem.words)?)
        .bind(serde_json::to_string(&poem.hashtags)?)
        .bind(&poem.writer)
        .bind(format_timestamp(poem.generated_at))
        .bind(format_timestamp(poem.published_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store `poem`, replacing whatever its date already had.
    pub async fn upsert_poem(&self, poem: &StoredPoem) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO poems (date, poem, words, hashtags, writer, generated_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                poem = excluded.poem,
                words = excluded.words,
                hashtags = excluded.hashtags,
                writer = excluded.writer,
                generated_at = excluded.generated_at,
                published_at = excluded.published_at
            "#,
        )
        .bind(&poem.date)
        .bind(&poem.poem)
        .bind(serde_json::to_string(&poem.words)?)
        .bind(serde_json::to_string(&poem.hashtags)?)
        .bind(&poem.writer)
        .bind(format_timestamp(poem.generated_at))
        .bind(format_timestamp(poem.published_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_poem(&self, date: &str) -> anyhow::Result<Option<StoredPoem>> {
        let row = sqlx::query_as::<_, PoemRow>("SELECT * FROM poems WHERE date = ?")
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        row.map(StoredPoem::try_from).transpose()
    }

    /// Most recently published poem at or before `at`.
    pub async fn latest_poem_before(
        &self,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<StoredPoem>> {
        let row = sqlx::query_as::<_, PoemRow>(
            r#"
            SELECT * FROM poems
            WHERE published_at <= ?
            ORDER BY published_at DESC, date DESC
            LIMIT 1
            "#,
        )
        .bind(format_timestamp(at))
        .fetch_optional(&self.pool)
        .await?;
        row.map(StoredPoem::try_from).transpose()
    }

    /// Every stored poem, newest date first.
    pub async fn list_poems(&self) -> anyhow::Result<Vec<StoredPoem>> {
        let rows = sqlx::query_as::<_, PoemRow>("SELECT * FROM poems ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredPoem::try_from).collect()
    }
}
