//! Perplexity web search: the model searches live sources and writes the summary.

use super::{http_client, post_chat, ChatMessage, ChatRequest, SearchProvider};
use crate::config::SearchConfig;
use async_trait::async_trait;
use std::time::Duration;

const SEARCH_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to real-time web search. \
Provide accurate, up-to-date information with proper context and citations when possible.";

pub struct PerplexitySearch {
    api_key: Option<String>,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl PerplexitySearch {
    /// Without a key every search reports no content.
    pub fn from_config(config: &SearchConfig, api_key: Option<&str>) -> Self {
        Self {
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http_client(Duration::from_secs(config.timeout_secs)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Wraps the raw query in the research brief sent as the user message.
pub(crate) fn search_prompt(query: &str) -> String {
    format!(
        "Please provide comprehensive, accurate, and up-to-date information about: {query}\n\n\
         Requirements:\n\
         - Include the most recent information available\n\
         - Cite key facts and figures when possible\n\
         - Mention relevant dates, events, or developments\n\
         - If discussing current events, note the timeliness\n\
         - Provide context and background when helpful\n\
         - Structure the response in a clear, readable format\n\n\
         Focus on delivering valuable insights that answer the user's query thoroughly."
    )
}

#[async_trait]
impl SearchProvider for PerplexitySearch {
    fn name(&self) -> &str {
        "perplexity"
    }

    async fn search(&self, query: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("Perplexity search skipped: no API key");
            return None;
        };
        let messages = [
            ChatMessage::system(SEARCH_SYSTEM_PROMPT),
            ChatMessage::user(search_prompt(query)),
        ];
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        match post_chat(&self.client, &self.api_url, api_key, &request).await {
            Ok(content) if !content.trim().is_empty() => Some(content),
            Ok(_) => {
                tracing::warn!("Perplexity search returned empty content");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Perplexity search error");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::canned;
    use axum::http::StatusCode;

    fn config_at(api_url: String) -> SearchConfig {
        SearchConfig {
            api_url,
            ..config()
        }
    }

    fn config() -> SearchConfig {
        SearchConfig {
            api_url: "http://127.0.0.1:9/chat/completions".into(),
            model: "sonar".into(),
            temperature: 0.2,
            max_tokens: 1500,
            timeout_secs: 1,
            instant_answer_fallback: false,
        }
    }

    #[test]
    fn prompt_embeds_query() {
        let p = search_prompt("rust 2024 edition");
        assert!(p.starts_with("Please provide comprehensive"));
        assert!(p.contains("about: rust 2024 edition"));
        assert!(p.contains("Cite key facts"));
    }

    #[tokio::test]
    async fn no_key_means_no_content() {
        let search = PerplexitySearch::from_config(&config(), None);
        assert!(!search.is_configured());
        assert_eq!(search.search("anything").await, None);
    }

    #[tokio::test]
    async fn unreachable_endpoint_means_no_content() {
        let search = PerplexitySearch::from_config(&config(), Some("key"));
        assert!(search.is_configured());
        assert_eq!(search.search("anything").await, None);
    }

    #[tokio::test]
    async fn blank_content_counts_as_no_result() {
        let url = canned::chat_endpoint(StatusCode::OK, canned::choice("  \n ")).await;
        let search = PerplexitySearch::from_config(&config_at(url), Some("key"));
        assert_eq!(search.search("rust news").await, None);
    }

    #[tokio::test]
    async fn error_status_counts_as_no_result() {
        let url = canned::chat_endpoint(StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({})).await;
        let search = PerplexitySearch::from_config(&config_at(url), Some("key"));
        assert_eq!(search.search("rust news").await, None);
    }

    #[tokio::test]
    async fn summary_content_is_returned() {
        let url = canned::chat_endpoint(StatusCode::OK, canned::choice("Rust 1.90 shipped.")).await;
        let search = PerplexitySearch::from_config(&config_at(url), Some("key"));
        assert_eq!(search.search("rust news").await.as_deref(), Some("Rust 1.90 shipped."));
    }
}
