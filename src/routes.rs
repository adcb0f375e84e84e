use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::fetcher::FeedDebug;
use crate::pipeline::TopicsRequest;
use crate::poem::{
    clamp_word_count, GenerateOptions, Generation, LatestPoem, PoemDraft, PoemService,
    DEFAULT_WORD_COUNT,
};
use crate::topics::{TopByCategory, TopicEntry};

pub const DEFAULT_TOPICS_LIMIT: usize = 10;
pub const MAX_TOPICS_LIMIT: usize = 100;

const PREVIEW_MARKER: &str = "\n\n— Aperçu (non publié) —";

pub struct AppState {
    pub service: Arc<PoemService>,
    /// Shared secret for the cron trigger; generation is refused when unset
    pub cron_secret: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/rss-topics", get(rss_topics))
        .route("/api/poem", get(poem))
        .route("/api/preview", get(preview))
        .route("/api/today", get(today))
        .route("/api/poems/latest", get(latest))
        .route("/api/cron/generate", post(cron_generate))
        .route("/api/manual-generate", get(manual_generate))
        .route("/api/daily-rotate", get(daily_rotate))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub poem: Option<LatestPoem>,
    pub published_label: String,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    InvalidParameter(&'static str),
    Unauthorized,
    NotReady,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidParameter(parameter) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_parameter", "parameter": parameter })),
            )
                .into_response(),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            AppError::NotReady => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_ready" })),
            )
                .into_response(),
            AppError::Internal(err) => {
                warn!("Request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error", "message": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError::Internal(err.into())
    }
}

/// Query parameters shared by every endpoint that runs the topic extractor.
/// Values stay raw strings so that bad integers can be reported by name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsQuery {
    pub feeds: Option<String>,
    pub limit: Option<String>,
    pub max_per_feed: Option<String>,
    pub debug: Option<String>,
}

/// Topics request and requested list length after validation.
#[derive(Debug, PartialEq)]
pub struct TopicsParams {
    pub request: TopicsRequest,
    pub limit: Option<usize>,
    pub debug: bool,
}

fn parse_bounded(
    name: &'static str,
    value: Option<&str>,
    min: i64,
    max: i64,
) -> Result<Option<i64>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => Ok(Some(n)),
            _ => Err(AppError::InvalidParameter(name)),
        },
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1") | Some("true"))
}

impl TopicsQuery {
    pub fn params(&self) -> Result<TopicsParams, AppError> {
        let limit = parse_bounded("limit", self.limit.as_deref(), 1, MAX_TOPICS_LIMIT as i64)?
            .map(|n| n as usize);
        let max_per_feed = parse_bounded("maxPerFeed", self.max_per_feed.as_deref(), 1, i64::MAX)?
            .map(|n| n as usize);

        let feeds: Vec<String> = self
            .feeds
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();

        Ok(TopicsParams {
            request: TopicsRequest {
                feeds: (!feeds.is_empty()).then_some(feeds),
                max_per_feed,
            },
            limit,
            debug: is_truthy(self.debug.as_deref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PoemQuery {
    #[serde(flatten)]
    pub topics: TopicsQuery,
    pub count: Option<String>,
    pub format: Option<String>,
    pub cache: Option<String>,
}

impl PoemQuery {
    /// Keyword count, clamped to `1..=8`. Anything unparsable means the default.
    pub fn word_count(&self) -> usize {
        self.count
            .as_deref()
            .and_then(|c| c.trim().parse::<i64>().ok())
            .map(clamp_word_count)
            .unwrap_or(DEFAULT_WORD_COUNT)
    }

    pub fn wants_text(&self) -> bool {
        self.format.as_deref().map(str::trim) == Some("txt")
    }

    pub fn cache_enabled(&self) -> bool {
        !matches!(
            self.cache.as_deref().map(|c| c.trim().to_lowercase()).as_deref(),
            Some("0") | Some("false")
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopicsResponse {
    date: String,
    top: Vec<TopicEntry>,
    top_by_category: TopByCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    all: Option<Vec<TopicEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_debug: Option<Vec<FeedDebug>>,
}

#[derive(Serialize)]
struct PoemResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    preview: bool,
    date: String,
    words: Vec<String>,
    poem: String,
    source: &'static str,
}

impl PoemResponse {
    fn new(draft: PoemDraft, preview: bool) -> Self {
        Self {
            status: "ok",
            preview,
            date: draft.date,
            words: draft.words,
            poem: draft.poem,
            source: "rss-topics",
        }
    }
}

fn text_response(text: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let poem = state.service.latest(Utc::now()).await?;
    let published_label = poem
        .as_ref()
        .map(|p| {
            p.published_at
                .with_timezone(&state.service.timezone())
                .format("%d/%m/%Y %H:%M")
                .to_string()
        })
        .unwrap_or_default();

    Ok(HtmlTemplate(IndexTemplate {
        poem,
        published_label,
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

pub async fn rss_topics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopicsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let params = query.params()?;
    let report = state.service.extractor().extract(&params.request).await;

    let limit = params.limit.unwrap_or(DEFAULT_TOPICS_LIMIT);
    let top = report.all.iter().take(limit).cloned().collect();
    let response = TopicsResponse {
        date: report.date,
        top,
        top_by_category: report.top_by_category,
        all: params.debug.then_some(report.all),
        feed_debug: params.debug.then_some(report.feed_debug),
    };

    Ok(Json(response))
}

pub async fn poem(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PoemQuery>,
) -> Result<Response, AppError> {
    let params = query.topics.params()?;
    let draft = state
        .service
        .preview(&params.request, query.word_count(), params.limit)
        .await;

    if query.wants_text() {
        return Ok(text_response(draft.poem));
    }
    Ok(Json(PoemResponse::new(draft, false)).into_response())
}

pub async fn preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PoemQuery>,
) -> Result<Response, AppError> {
    let params = query.topics.params()?;
    let draft = state
        .service
        .preview(&params.request, query.word_count(), params.limit)
        .await;

    let mut response = if query.wants_text() {
        text_response(format!("{}{}", draft.poem, PREVIEW_MARKER))
    } else {
        Json(PoemResponse::new(draft, true)).into_response()
    };

    let cache_control = if query.cache_enabled() {
        "public, s-maxage=60, stale-while-revalidate=120"
    } else {
        "no-store"
    };
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static(cache_control),
    );
    Ok(response)
}

pub async fn today(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let date = crate::calendar::format_date(state.service.today());
    let stored = match state.service.db().get_poem(&date).await? {
        Some(poem) => poem,
        None => state
            .service
            .db()
            .latest_poem_before(Utc::now())
            .await?
            .ok_or(AppError::NotReady)?,
    };

    Ok(Json(json!({
        "date": stored.date,
        "poem": stored.poem,
        "hashtags": stored.hashtags,
        "generatedAt": stored.generated_at,
        "note": format!("Poème du {} (affiché jusqu’à la prochaine génération)", stored.date),
    })))
}

pub async fn latest(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let poem = state.service.latest(Utc::now()).await?;
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(poem),
    ))
}

fn generation_response(generation: Generation, date: String) -> Response {
    let status = match generation {
        Generation::InProgress => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    let body = json!({
        "status": generation.status(),
        "date": date,
        "poem": generation.poem().map(|p| p.poem.clone()),
        "publishedAt": generation.poem().map(|p| p.published_at),
    });
    (status, Json(body)).into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let provided = headers
        .get("x-cron-secret")
        .and_then(|v| v.to_str().ok());
    match (&state.cron_secret, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() && expected == provided => Ok(()),
        _ => {
            warn!("Rejected generation trigger without a valid secret");
            Err(AppError::Unauthorized)
        }
    }
}

pub async fn cron_generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    authorize(&state, &headers)?;

    let date = state.service.today();
    let generation = state.service.generate_for(date).await?;
    info!("Cron generation for {}: {}", date, generation.status());
    Ok(generation_response(
        generation,
        crate::calendar::format_date(date),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct RotateQuery {
    pub force: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManualQuery {
    pub force: Option<String>,
    pub visible: Option<String>,
}

impl ManualQuery {
    /// Without `visible=1` the poem only shows from the publish window on.
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            force: is_truthy(self.force.as_deref()),
            visible: is_truthy(self.visible.as_deref()),
        }
    }
}

pub async fn manual_generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ManualQuery>,
) -> Result<Response, AppError> {
    authorize(&state, &headers)?;

    let date = state.service.today();
    let options = query.options();
    let generation = state.service.generate_with(date, options).await?;
    info!(
        "Manual generation for {} (force: {}, visible: {}): {}",
        date,
        options.force,
        options.visible,
        generation.status()
    );

    let mut response = generation_response(generation, crate::calendar::format_date(date));
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    Ok(response)
}

pub async fn daily_rotate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RotateQuery>,
) -> Result<Response, AppError> {
    let force = matches!(
        query.force.as_deref().map(|f| f.trim().to_lowercase()).as_deref(),
        Some("1") | Some("true")
    );
    if !force && !state.service.in_publish_window(Utc::now()) {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let date = state.service.today();
    let generation = state.service.generate_for(date).await?;
    info!("Daily rotation for {}: {}", date, generation.status());

    let status = match generation {
        Generation::InProgress => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({
            "status": generation.status(),
            "date": crate::calendar::format_date(date),
        })),
    )
        .into_response())
}
