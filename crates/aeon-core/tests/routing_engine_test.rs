//! Integration test: routing engine strategy order, fallback chaining, and memory writes.
//!
//! Providers are stubs that record how often they were called, so each test can assert
//! both the answer and which collaborators were (not) consulted.

use aeon_core::{
    AeonError, ChatInput, ChatMessage, CompletionProvider, ConversationStore, MemoryStore,
    ModeHint, ModeUsed, ProviderError, Role, RoutingEngine, SearchProvider, Strategy,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

struct StubSearch {
    result: Option<&'static str>,
    calls: AtomicUsize,
}

impl StubSearch {
    fn returning(result: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, _query: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.map(str::to_string)
    }
}

struct StubCompletion {
    result: Result<&'static str, ProviderError>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubCompletion {
    fn answering(result: Result<&'static str, ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last_messages(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for StubCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.result.clone().map(str::to_string)
    }
}

struct Harness {
    engine: RoutingEngine,
    store: Arc<MemoryStore>,
    search: Arc<StubSearch>,
    completion: Arc<StubCompletion>,
}

fn harness(search: Option<&'static str>, completion: Result<&'static str, ProviderError>) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let search = StubSearch::returning(search);
    let completion = StubCompletion::answering(completion);
    let engine = RoutingEngine::new(
        store.clone(),
        search.clone(),
        Some(completion.clone() as Arc<dyn CompletionProvider>),
        "AEON",
    );
    Harness {
        engine,
        store,
        search,
        completion,
    }
}

#[tokio::test]
async fn empty_input_is_rejected_and_not_recorded() {
    let h = harness(None, Ok("unused"));
    let err = h
        .engine
        .handle(ChatInput::new("   ", ModeHint::Auto))
        .await
        .unwrap_err();
    assert!(matches!(err, AeonError::EmptyInput));
    assert!(err.is_client_error());
    assert!(h.store.load().is_empty());
}

#[tokio::test]
async fn time_question_is_answered_locally() {
    let h = harness(Some("web"), Ok("llm"));
    let d = h
        .engine
        .handle(ChatInput::new("What time is it?", ModeHint::Web))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Clock);
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert!(d.response.starts_with("🕐 The current time is "));
    assert!(d.response.ends_with("(UTC)."));
    assert_eq!(h.search.calls(), 0);
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test]
async fn arithmetic_is_evaluated_locally() {
    let h = harness(Some("web"), Ok("llm"));
    let d = h
        .engine
        .handle(ChatInput::new("Calculate 12 * (3 + 4)?", ModeHint::Auto))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Arithmetic);
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert!(d.response.contains("**84**"));
    assert!(d.response.contains("Calculate 12 * (3 + 4)?"));
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test]
async fn failed_arithmetic_falls_through_to_completion() {
    let h = harness(Some("web"), Ok("division by zero is undefined"));
    let d = h
        .engine
        .handle(ChatInput::new("Calculate 1 / 0?", ModeHint::Auto))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Completion);
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert_eq!(d.response, "division by zero is undefined");
    // Three tokens with an operator: the classifier keeps this away from search.
    assert_eq!(h.search.calls(), 0);
    assert_eq!(h.completion.calls(), 1);
}

#[tokio::test]
async fn forced_web_success_is_wrapped() {
    let h = harness(Some("Rust 1.80 shipped."), Ok("llm"));
    let d = h
        .engine
        .handle(ChatInput::new("rust release", ModeHint::Web))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::ForcedWebSearch);
    assert_eq!(d.mode_used, ModeUsed::Web);
    assert_eq!(
        d.response,
        "🔍 **Live Web Search Results:**\n\nRust 1.80 shipped.\n\n*(Information from real-time sources)*"
    );
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test]
async fn forced_web_failure_never_falls_back() {
    let h = harness(None, Ok("llm"));
    let d = h
        .engine
        .handle(ChatInput::new("anything at all here", ModeHint::Web))
        .await
        .unwrap();
    assert_eq!(d.mode_used, ModeUsed::Web);
    assert_eq!(d.response, "❌ I couldn't find relevant live information.");
    assert_eq!(h.search.calls(), 1);
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test]
async fn auto_mode_searches_when_classifier_agrees() {
    let h = harness(Some("fresh facts"), Ok("llm"));
    let d = h
        .engine
        .handle(ChatInput::new("Who is Ada Lovelace", ModeHint::Auto))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::AutoWebSearch);
    assert_eq!(d.mode_used, ModeUsed::Web);
    assert!(d.response.contains("fresh facts"));
}

#[tokio::test]
async fn auto_mode_search_failure_silently_uses_completion() {
    let h = harness(None, Ok("from the model"));
    let d = h
        .engine
        .handle(ChatInput::new("Who is Ada Lovelace", ModeHint::Auto))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Completion);
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert_eq!(d.response, "from the model");
    assert_eq!(h.search.calls(), 1);
    assert_eq!(h.completion.calls(), 1);
}

#[tokio::test]
async fn auto_mode_skips_search_for_short_messages() {
    let h = harness(Some("web"), Ok("hi there"));
    let d = h
        .engine
        .handle(ChatInput::new("hello", ModeHint::Auto))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Completion);
    assert_eq!(h.search.calls(), 0);
}

#[tokio::test]
async fn ai_mode_never_searches() {
    let h = harness(Some("web"), Ok("model answer"));
    let d = h
        .engine
        .handle(ChatInput::new("What is the latest news about Mars", ModeHint::Ai))
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::Completion);
    assert_eq!(h.search.calls(), 0);
}

#[tokio::test]
async fn files_get_the_placeholder() {
    let h = harness(None, Ok("llm"));
    let d = h
        .engine
        .handle(
            ChatInput::new("", ModeHint::Auto).with_files(vec![serde_json::json!({"name": "cat.png"})]),
        )
        .await
        .unwrap();
    assert_eq!(d.strategy, Strategy::FilePlaceholder);
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert!(d.response.contains("File analysis isn't implemented yet"));
    assert_eq!(h.completion.calls(), 0);

    let stored = h.store.load();
    assert_eq!(stored.turns()[0].files, vec![serde_json::json!({"name": "cat.png"})]);
}

#[tokio::test]
async fn provider_status_becomes_assistant_text() {
    let h = harness(None, Err(ProviderError::Status(503)));
    let d = h
        .engine
        .handle(ChatInput::new("hi", ModeHint::Ai))
        .await
        .unwrap();
    assert_eq!(d.response, "❌ API error: 503");
    assert_eq!(h.store.load().turns()[1].content, "❌ API error: 503");
}

#[tokio::test]
async fn provider_transport_failure_becomes_assistant_text() {
    let h = harness(None, Err(ProviderError::Transport("operation timed out".into())));
    let d = h
        .engine
        .handle(ChatInput::new("hi", ModeHint::Ai))
        .await
        .unwrap();
    assert_eq!(d.response, "❌ Connection issue: operation timed out");
}

#[tokio::test]
async fn missing_completion_credential_degrades_to_advisory() {
    let store = Arc::new(MemoryStore::default());
    let engine = RoutingEngine::new(store.clone(), StubSearch::returning(None), None, "AEON");
    let d = engine
        .handle(ChatInput::new("hi", ModeHint::Ai))
        .await
        .unwrap();
    assert_eq!(d.response, "🔑 OpenRouter API key not configured.");
    assert_eq!(d.mode_used, ModeUsed::Ai);
    assert_eq!(store.load().len(), 2);
}

#[tokio::test]
async fn completion_sees_system_instruction_and_full_transcript() {
    let h = harness(None, Ok("second answer"));
    h.engine
        .handle(ChatInput::new("first question", ModeHint::Ai))
        .await
        .unwrap();
    h.engine
        .handle(ChatInput::new("second question", ModeHint::Ai))
        .await
        .unwrap();

    let messages = h.completion.last_messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[0].content, "You are AEON. Mode: ai.");
    assert_eq!(messages[1].content, "first question");
    assert_eq!(messages[2].role, "assistant");
    assert_eq!(messages[3].content, "second question");
}

#[tokio::test]
async fn every_turn_appends_user_then_assistant() {
    let h = harness(None, Ok("ok"));
    for i in 0..3 {
        h.engine
            .handle(ChatInput::new(format!("  message {}  ", i), ModeHint::Ai))
            .await
            .unwrap();
    }
    let t = h.store.load();
    assert_eq!(t.len(), 6);
    for (i, pair) in t.turns().chunks(2).enumerate() {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[0].content, format!("message {}", i));
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, "ok");
    }
}

#[tokio::test]
async fn memory_is_capped_at_twenty_turns() {
    let h = harness(None, Ok("ok"));
    for i in 0..13 {
        h.engine
            .handle(ChatInput::new(format!("m{}", i), ModeHint::Ai))
            .await
            .unwrap();
    }
    let t = h.engine.transcript().await;
    assert_eq!(t.len(), 20);
    assert_eq!(t.turns()[0].content, "m3");
    assert_eq!(t.turns()[19].role, Role::Assistant);
}

#[tokio::test]
async fn concurrent_turns_do_not_interleave() {
    let h = Arc::new(harness(None, Ok("ok")));
    let mut handles = Vec::new();
    for i in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.engine
                .handle(ChatInput::new(format!("q{}", i), ModeHint::Ai))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let t = h.store.load();
    assert_eq!(t.len(), 16);
    for pair in t.turns().chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
    }
}

#[tokio::test]
async fn clear_empties_memory() {
    let h = harness(None, Ok("ok"));
    h.engine
        .handle(ChatInput::new("hello", ModeHint::Ai))
        .await
        .unwrap();
    h.engine.clear().await.unwrap();
    assert!(h.engine.transcript().await.is_empty());
}

/// Completion that blocks until released, so a turn can be held open.
#[derive(Default)]
struct GatedCompletion {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionProvider for GatedCompletion {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("late answer".to_string())
    }
}

#[tokio::test]
async fn transcript_read_waits_for_in_flight_turn() {
    let gate = Arc::new(GatedCompletion::default());
    let engine = Arc::new(RoutingEngine::new(
        Arc::new(MemoryStore::default()),
        StubSearch::returning(None),
        Some(gate.clone() as Arc<dyn CompletionProvider>),
        "AEON",
    ));

    let turn = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .handle(ChatInput::new("slow question", ModeHint::Ai))
                .await
                .unwrap()
        })
    };
    gate.entered.notified().await;

    let blocked = tokio::time::timeout(Duration::from_millis(50), engine.transcript()).await;
    assert!(blocked.is_err());

    gate.release.notify_one();
    assert_eq!(turn.await.unwrap().response, "late answer");

    let t = engine.transcript().await;
    assert_eq!(t.len(), 2);
    assert_eq!(t.turns()[1].content, "late answer");
}
