//! aeon-core: routing engine and the pieces it routes between.
//!
//! A chat message is answered by exactly one strategy: the local clock, the local
//! arithmetic evaluator, a live web search, a file-upload placeholder, or a language-model
//! completion. The engine also owns the bounded conversation memory that every turn is
//! written to.

pub mod arithmetic;
pub mod config;
mod error;
pub mod providers;
pub mod router;
pub mod search_trigger;
pub mod time_service;
pub mod transcript;

pub use config::{CompletionConfig, CoreConfig, Credentials, SearchConfig, StorageConfig};
pub use error::{AeonError, Result};
pub use providers::{
    ChatMessage, CompletionProvider, InstantAnswerSearch, OpenRouterCompletion, PerplexitySearch,
    ProviderError, SearchChain, SearchProvider,
};
pub use router::{ChatInput, ModeHint, ModeUsed, RoutingDecision, RoutingEngine, Strategy};
pub use search_trigger::should_search;
pub use time_service::{current_time_info, TimeInfo};
pub use transcript::{
    ConversationStore, JsonFileStore, MemoryStore, Role, Transcript, Turn, TRANSCRIPT_LIMIT,
};
