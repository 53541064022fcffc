//! Keyless search fallback: Wikipedia page summary, then DuckDuckGo instant answers.

use super::{http_client, SearchProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct WikipediaSummary {
    #[serde(default)]
    extract: Option<String>,
}

#[derive(Deserialize)]
struct DuckDuckGoAnswer {
    #[serde(rename = "Abstract", default)]
    abstract_text: String,
    #[serde(rename = "Answer", default)]
    answer: String,
}

pub struct InstantAnswerSearch {
    wikipedia_url: String,
    duckduckgo_url: String,
    client: reqwest::Client,
}

impl InstantAnswerSearch {
    pub fn new() -> Self {
        Self::with_endpoints(WIKIPEDIA_SUMMARY_URL, DUCKDUCKGO_URL)
    }

    pub fn with_endpoints(wikipedia_url: impl Into<String>, duckduckgo_url: impl Into<String>) -> Self {
        Self {
            wikipedia_url: wikipedia_url.into(),
            duckduckgo_url: duckduckgo_url.into(),
            client: http_client(LOOKUP_TIMEOUT),
        }
    }

    async fn wikipedia(&self, query: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}{}", self.wikipedia_url, page_title(query));
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Ok(None);
        }
        let summary: WikipediaSummary = res.json().await?;
        Ok(Some(
            summary
                .extract
                .unwrap_or_else(|| "No summary available.".to_string()),
        ))
    }

    async fn duckduckgo(&self, query: &str) -> Result<Option<String>, reqwest::Error> {
        let res = self
            .client
            .get(&self.duckduckgo_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            return Ok(None);
        }
        let answer: DuckDuckGoAnswer = res.json().await?;
        Ok(pick_answer(answer))
    }
}

impl Default for InstantAnswerSearch {
    fn default() -> Self {
        Self::new()
    }
}

/// Wikipedia titles use underscores; everything else is percent-encoded by path rules.
fn page_title(query: &str) -> String {
    query
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
}

fn pick_answer(answer: DuckDuckGoAnswer) -> Option<String> {
    [answer.abstract_text, answer.answer]
        .into_iter()
        .find(|s| !s.trim().is_empty())
}

#[async_trait]
impl SearchProvider for InstantAnswerSearch {
    fn name(&self) -> &str {
        "instant_answer"
    }

    async fn search(&self, query: &str) -> Option<String> {
        let found = match self.wikipedia(query).await {
            Ok(Some(summary)) => Ok(Some(summary)),
            Ok(None) => self.duckduckgo(query).await,
            Err(e) => Err(e),
        };
        match found {
            Ok(result) => result.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Instant answer search error");
                None
            }
        }
    }
}
