//! OpenRouter completion provider.

use super::{http_client, post_chat, ChatMessage, ChatRequest, CompletionProvider, ProviderError};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenRouterCompletion {
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenRouterCompletion {
    /// Returns `None` when no key is configured; the engine then answers with an advisory.
    pub fn from_config(config: &CompletionConfig, api_key: Option<&str>) -> Option<Self> {
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty())?;
        Some(Self {
            api_key: api_key.to_string(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http_client(Duration::from_secs(config.timeout_secs)),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(model = %self.model, messages = messages.len(), "OpenRouter completion");
        post_chat(&self.client, &self.api_url, &self.api_key, &request).await
    }
}
