//! Routing engine: turns one chat message into exactly one assistant response.
//!
//! Strategies are tried in [`Strategy::ORDER`]. Each has a predicate (does it apply to this
//! message?) and a handler that may still decline, in which case the next strategy runs.
//! [`Strategy::Completion`] is terminal and always answers, including with user-visible
//! error text when the provider fails.
//!
//! A chat turn holds the conversation lock from load to save, so concurrent requests
//! append their user/assistant pairs one after another.

use crate::arithmetic;
use crate::error::{AeonError, Result};
use crate::providers::{ChatMessage, CompletionProvider, ProviderError, SearchProvider};
use crate::search_trigger::should_search;
use crate::time_service;
use crate::transcript::{ConversationStore, Role, Transcript, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const WEB_SEARCH_FAILED: &str = "❌ I couldn't find relevant live information.";
pub const FILES_NOT_SUPPORTED: &str = "📁 I received your files. File analysis isn't implemented yet.";
pub const COMPLETION_NOT_CONFIGURED: &str = "🔑 OpenRouter API key not configured.";

/// Caller preference for how the message should be answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeHint {
    #[default]
    Auto,
    Ai,
    Web,
}

impl ModeHint {
    /// Unknown hints behave like `ai`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "auto" => ModeHint::Auto,
            "web" => ModeHint::Web,
            "ai" => ModeHint::Ai,
            other => {
                debug!(mode = other, "Unrecognized mode hint; treating as ai");
                ModeHint::Ai
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModeHint::Auto => "auto",
            ModeHint::Ai => "ai",
            ModeHint::Web => "web",
        }
    }
}

/// Label reported to the caller. Local answers (clock, arithmetic, files) report `ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeUsed {
    Ai,
    Web,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Clock,
    Arithmetic,
    ForcedWebSearch,
    AutoWebSearch,
    FilePlaceholder,
    Completion,
}

impl Strategy {
    /// Fallible strategies in priority order. [`Strategy::Completion`] runs after all of
    /// them decline.
    pub const ORDER: [Strategy; 5] = [
        Strategy::Clock,
        Strategy::Arithmetic,
        Strategy::ForcedWebSearch,
        Strategy::AutoWebSearch,
        Strategy::FilePlaceholder,
    ];

    /// Predicate half: whether this strategy should be attempted for the message.
    pub fn applies(self, input: &ChatInput) -> bool {
        match self {
            Strategy::Clock => time_service::mentions_time(&input.message),
            Strategy::Arithmetic => arithmetic::has_calculation_intent(&input.message),
            Strategy::ForcedWebSearch => input.mode == ModeHint::Web,
            Strategy::AutoWebSearch => input.mode == ModeHint::Auto && should_search(&input.message),
            Strategy::FilePlaceholder => !input.files.is_empty(),
            Strategy::Completion => true,
        }
    }

    pub fn mode_used(self) -> ModeUsed {
        match self {
            Strategy::ForcedWebSearch | Strategy::AutoWebSearch => ModeUsed::Web,
            _ => ModeUsed::Ai,
        }
    }
}

/// One inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    pub message: String,
    pub files: Vec<serde_json::Value>,
    pub mode: ModeHint,
}

impl ChatInput {
    pub fn new(message: impl Into<String>, mode: ModeHint) -> Self {
        Self {
            message: message.into(),
            files: Vec::new(),
            mode,
        }
    }

    pub fn with_files(mut self, files: Vec<serde_json::Value>) -> Self {
        self.files = files;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub response: String,
    pub mode_used: ModeUsed,
    /// The strategy that produced `response`.
    pub strategy: Strategy,
}

impl RoutingDecision {
    fn by(strategy: Strategy, response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            mode_used: strategy.mode_used(),
            strategy,
        }
    }
}

pub struct RoutingEngine {
    store: Arc<dyn ConversationStore>,
    search: Arc<dyn SearchProvider>,
    /// `None` when no credential is configured.
    completion: Option<Arc<dyn CompletionProvider>>,
    persona: String,
    conversation: Mutex<()>,
}

impl RoutingEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        search: Arc<dyn SearchProvider>,
        completion: Option<Arc<dyn CompletionProvider>>,
        persona: impl Into<String>,
    ) -> Self {
        Self {
            store,
            search,
            completion,
            persona: persona.into(),
            conversation: Mutex::new(()),
        }
    }

    /// Answer one message: validate, append the user turn, route, append the assistant
    /// turn, save. Nothing is written when validation fails.
    pub async fn handle(&self, input: ChatInput) -> Result<RoutingDecision> {
        let input = ChatInput {
            message: input.message.trim().to_string(),
            ..input
        };
        info!(
            message = %input.message,
            mode = input.mode.as_str(),
            files = input.files.len(),
            "Received chat message"
        );
        if input.message.is_empty() && input.files.is_empty() {
            return Err(AeonError::EmptyInput);
        }

        let _turn = self.conversation.lock().await;
        let mut transcript = self.store.load();
        transcript.push(Turn::user(input.message.clone(), input.files.clone()));

        let decision = self.route(&input, &transcript).await;
        info!(strategy = ?decision.strategy, mode_used = ?decision.mode_used, "Routed chat message");

        transcript.push(Turn::assistant(decision.response.clone()));
        self.store.save(&transcript)?;
        Ok(decision)
    }

    /// Current persisted transcript. Waits for any in-flight chat turn, since loading a
    /// corrupted file rewrites it.
    pub async fn transcript(&self) -> Transcript {
        let _turn = self.conversation.lock().await;
        self.store.load()
    }

    /// Empty the transcript. Waits for any in-flight chat turn to finish first.
    pub async fn clear(&self) -> Result<()> {
        let _turn = self.conversation.lock().await;
        self.store.clear()?;
        info!("Memory cleared");
        Ok(())
    }

    async fn route(&self, input: &ChatInput, transcript: &Transcript) -> RoutingDecision {
        for strategy in Strategy::ORDER {
            if !strategy.applies(input) {
                continue;
            }
            if let Some(decision) = self.attempt(strategy, input).await {
                return decision;
            }
            debug!(?strategy, "Strategy declined; falling through");
        }
        self.complete(input, transcript).await
    }

    /// Handler half of the fallible strategies. `None` means fall through.
    async fn attempt(&self, strategy: Strategy, input: &ChatInput) -> Option<RoutingDecision> {
        match strategy {
            Strategy::Clock => {
                let info = time_service::current_time_info();
                Some(RoutingDecision::by(strategy, time_service::clock_answer(&info)))
            }
            Strategy::Arithmetic => {
                arithmetic::answer(&input.message).map(|text| RoutingDecision::by(strategy, text))
            }
            Strategy::ForcedWebSearch => {
                let text = match self.search.search(&input.message).await {
                    Some(result) => web_results(&result),
                    None => WEB_SEARCH_FAILED.to_string(),
                };
                Some(RoutingDecision::by(strategy, text))
            }
            Strategy::AutoWebSearch => match self.search.search(&input.message).await {
                Some(result) => Some(RoutingDecision::by(strategy, web_results(&result))),
                None => {
                    warn!("Web search failed; falling back to AI");
                    None
                }
            },
            Strategy::FilePlaceholder => Some(RoutingDecision::by(strategy, FILES_NOT_SUPPORTED)),
            Strategy::Completion => None,
        }
    }

    async fn complete(&self, input: &ChatInput, transcript: &Transcript) -> RoutingDecision {
        let strategy = Strategy::Completion;
        let Some(provider) = &self.completion else {
            return RoutingDecision::by(strategy, COMPLETION_NOT_CONFIGURED);
        };

        let messages = completion_messages(&self.persona, input.mode, transcript);
        let text = match provider.complete(&messages).await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Completion provider failed");
                completion_failure(&e)
            }
        };
        RoutingDecision::by(strategy, text)
    }
}

/// System instruction followed by the whole transcript.
pub fn completion_messages(persona: &str, mode: ModeHint, transcript: &Transcript) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatMessage::system(format!(
        "You are {}. Mode: {}.",
        persona,
        mode.as_str()
    )));
    messages.extend(transcript.turns().iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
        },
        content: turn.content.clone(),
    }));
    messages
}

fn web_results(result: &str) -> String {
    format!(
        "🔍 **Live Web Search Results:**\n\n{}\n\n*(Information from real-time sources)*",
        result
    )
}

fn completion_failure(err: &ProviderError) -> String {
    match err {
        ProviderError::Status(code) => format!("❌ API error: {}", code),
        other => format!("❌ Connection issue: {}", other),
    }
}
