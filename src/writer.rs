//! Turning a handful of keywords into a poem.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::poem::{hashtags, template_poem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemRequest {
    pub date: String,
    pub words: Vec<String>,
}

impl PoemRequest {
    pub fn hashtags(&self) -> Vec<String> {
        hashtags(&self.words)
    }
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("writer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid writer response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PoemWriter: Send + Sync {
    /// Short identifier stored alongside each poem
    fn name(&self) -> &str;

    async fn write(&self, request: &PoemRequest) -> Result<String, WriterError>;
}

/// Fixed French template with the keywords woven in.
#[derive(Debug, Default, Clone)]
pub struct TemplateWriter;

#[async_trait]
impl PoemWriter for TemplateWriter {
    fn name(&self) -> &str {
        "template"
    }

    async fn write(&self, request: &PoemRequest) -> Result<String, WriterError> {
        Ok(template_poem(&request.words))
    }
}

pub fn build_prompt(hashtags: &[String]) -> String {
    format!(
        "Compose un poème original en français de 12 à 20 vers. \
         Inspire-toi des hashtags suivants sans les répéter littéralement plus d'une fois chacun : {}. \
         Le poème doit évoquer leurs thèmes de manière créative et sensible, sans liste de hashtags. \
         Réponds uniquement en JSON avec la structure {{\"poem\": \"...\"}} où \"poem\" contient le poème en plusieurs lignes.",
        hashtags.join(", ")
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct PoemPayload {
    poem: Option<String>,
}

/// Writer backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiWriter {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiWriter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, api_base: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn parse_poem(body: &str) -> Result<String, WriterError> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| WriterError::InvalidResponse(format!("malformed body: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| WriterError::InvalidResponse("no message content".to_string()))?;

        let payload: PoemPayload = serde_json::from_str(content.trim()).map_err(|e| {
            WriterError::InvalidResponse(format!("content is not JSON: {}", e))
        })?;

        payload
            .poem
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| WriterError::InvalidResponse("missing poem field".to_string()))
    }
}

#[async_trait]
impl PoemWriter for OpenAiWriter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn write(&self, request: &PoemRequest) -> Result<String, WriterError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(&request.hashtags()),
            }],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("Requesting poem for {} from model {}", request.date, self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(WriterError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let poem = Self::parse_poem(&text)?;
        info!("Model {} wrote {} lines", self.model, poem.lines().count());
        Ok(poem)
    }
}
