//! External answer providers: web search and language-model completion.
//!
//! Both speak the OpenAI-compatible chat completions shape. Each is a single bounded call;
//! a search failure is "no content", a completion failure is a [`ProviderError`] that the
//! routing engine turns into assistant text.

mod instant_answer;
mod openrouter;
mod perplexity;

pub use instant_answer::InstantAnswerSearch;
pub use openrouter::OpenRouterCompletion;
pub use perplexity::PerplexitySearch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// One chat message in an OpenAI-compatible request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),
    /// Connection failure, timeout, or an unreadable body.
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Live web search that returns a written summary.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the provider produced no usable content for any reason.
    async fn search(&self, query: &str) -> Option<String>;
}

/// Language-model completion over a full message list.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

/// Tries search providers in order and returns the first non-empty result.
pub struct SearchChain {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl SearchChain {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl SearchProvider for SearchChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn search(&self, query: &str) -> Option<String> {
        for provider in &self.providers {
            if let Some(result) = provider.search(query).await {
                return Some(result);
            }
            tracing::debug!(provider = provider.name(), "Search provider returned nothing");
        }
        None
    }
}

// OpenAI-compatible request/response structures shared by both HTTP providers.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// POST a chat completion and return `choices[0].message.content`.
async fn post_chat(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    request: &ChatRequest<'_>,
) -> Result<String, ProviderError> {
    let res = client
        .post(url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, url, "Provider returned an error status");
        return Err(ProviderError::Status(status.as_u16()));
    }

    let text = res.text().await?;
    let parsed: ChatResponse = serde_json::from_str(&text)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("no choices[0].message.content".to_string()))
}

fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "HTTP client builder failed; using defaults without timeout");
            reqwest::Client::new()
        })
}
