//! AEON Gateway: chat routing service (`/chat`, `/memory`, `/health`).

mod app;

use aeon_core::{
    CompletionProvider, CoreConfig, Credentials, InstantAnswerSearch, JsonFileStore,
    OpenRouterCompletion, PerplexitySearch, RoutingEngine, SearchChain, SearchProvider,
};
use app::{build_app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keys live in .env / the process environment only, never in config files.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[aeon-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CoreConfig::load()?;
    let credentials = Credentials::from_env();
    tracing::info!(app = %config.app_name, ?credentials, "Starting {} server", config.app_name);

    let memory_file = config.storage.memory_file();
    tracing::info!(path = %memory_file.display(), "Using memory file");
    let store = Arc::new(JsonFileStore::open(&memory_file, config.storage.transcript_limit)?);

    let perplexity = PerplexitySearch::from_config(
        &config.search,
        credentials.perplexity_api_key.as_deref(),
    );
    if !perplexity.is_configured() {
        tracing::warn!("PERPLEXITY_API_KEY not set; web search will report no results");
    }
    let search: Arc<dyn SearchProvider> = if config.search.instant_answer_fallback {
        let chain: Vec<Arc<dyn SearchProvider>> =
            vec![Arc::new(perplexity), Arc::new(InstantAnswerSearch::new())];
        Arc::new(SearchChain::new(chain))
    } else {
        Arc::new(perplexity)
    };

    let completion = OpenRouterCompletion::from_config(
        &config.completion,
        credentials.openrouter_api_key.as_deref(),
    )
    .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>);
    if completion.is_none() {
        tracing::warn!("OPENROUTER_API_KEY not set; AI answers will be an advisory message");
    }

    let engine = RoutingEngine::new(store, search, completion, config.completion.persona.clone());
    let frontend_dir = frontend_dir(config.frontend_enabled, &config.frontend_dir);
    let app = build_app(
        AppState {
            engine: Arc::new(engine),
        },
        frontend_dir,
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// The static UI directory to serve, if enabled and present.
fn frontend_dir(enabled: bool, dir: &str) -> Option<PathBuf> {
    if !enabled {
        return None;
    }
    let dir = PathBuf::from(dir);
    if !dir.is_dir() {
        tracing::warn!(
            dir = %dir.display(),
            "frontend_enabled is set but the frontend directory is missing; UI not served"
        );
        return None;
    }
    Some(dir)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
