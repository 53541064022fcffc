//! Search trigger classifier: decides whether a message is worth a live web search.
//!
//! Rules run in a fixed order and the first one that matches decides. Length rules come
//! before phrase matching, so "who is" on its own never searches.

use tracing::debug;

/// Phrases that signal the user wants fresh information.
pub const TRIGGER_PHRASES: &[&str] = &[
    "latest",
    "current",
    "recent",
    "news",
    "today",
    "breaking",
    "update on",
    "what happened",
    "current events",
    "headlines",
    "weather in",
    "stock price",
    "crypto",
    "bitcoin price",
    "sports scores",
    "election results",
    "live updates",
    "search for",
    "find information about",
    "look up",
    "who is",
    "what is the latest",
    "how to",
    "best way to",
    "current situation",
    "recent developments",
    "trending",
    "viral",
];

/// Topics whose answers go stale quickly.
pub const ENTITY_KEYWORDS: &[&str] = &[
    "war",
    "election",
    "game",
    "match",
    "price",
    "weather",
    "movie",
    "celebrity",
    "company",
    "stock",
    "crypto",
];

const OPERATORS: &[char] = &['+', '-', '*', '/'];
const SHORT_MATH_MAX_TOKENS: usize = 5;
const MIN_QUERY_TOKENS: usize = 3;
const SUBSTANTIAL_QUERY_TOKENS: usize = 3;

/// Why [`classify`] decided the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVerdict {
    ShortMath,
    TooShort,
    Trigger(&'static str),
    Entity(&'static str),
    Substantial,
    NoSignal,
}

impl SearchVerdict {
    pub fn should_search(self) -> bool {
        matches!(
            self,
            SearchVerdict::Trigger(_) | SearchVerdict::Entity(_) | SearchVerdict::Substantial
        )
    }
}

pub fn classify(message: &str) -> SearchVerdict {
    let lower = message.trim().to_lowercase();
    let tokens = message.split_whitespace().count();

    if message.contains(OPERATORS) && tokens <= SHORT_MATH_MAX_TOKENS {
        return SearchVerdict::ShortMath;
    }
    if tokens < MIN_QUERY_TOKENS {
        return SearchVerdict::TooShort;
    }
    if let Some(phrase) = TRIGGER_PHRASES.iter().copied().find(|p| lower.contains(p)) {
        return SearchVerdict::Trigger(phrase);
    }
    if let Some(entity) = ENTITY_KEYWORDS.iter().copied().find(|e| lower.contains(e)) {
        return SearchVerdict::Entity(entity);
    }
    if tokens > SUBSTANTIAL_QUERY_TOKENS {
        return SearchVerdict::Substantial;
    }
    SearchVerdict::NoSignal
}

/// Whether an `auto` mode message should go to the web search provider.
pub fn should_search(message: &str) -> bool {
    let verdict = classify(message);
    debug!(?verdict, "Analyzing for web search: '{}'", message.trim());
    verdict.should_search()
}
