//! HTTP surface: chat, memory, health, and the optional static frontend.

use aeon_core::{current_time_info, AeonError, ChatInput, ModeHint, ModeUsed, RoutingEngine, Turn};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RoutingEngine>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    files: Vec<serde_json::Value>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    response: String,
    timestamp: String,
    mode_used: ModeUsed,
}

/// Boundary error: 400 for bad requests, a generic 500 for everything else.
pub enum ApiError {
    Core(AeonError),
    BadBody(String),
}

impl From<AeonError> for ApiError {
    fn from(err: AeonError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadBody(detail) => {
                tracing::warn!(%detail, "Rejected chat request body");
                error_body(StatusCode::BAD_REQUEST, &detail)
            }
            ApiError::Core(err) if err.is_client_error() => {
                error_body(StatusCode::BAD_REQUEST, &err.to_string())
            }
            ApiError::Core(err) => {
                tracing::error!(error = %err, "Critical error while handling request");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Unreadable, untyped, or mistyped request bodies are the caller's fault.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub fn build_app(state: AppState, frontend_dir: Option<PathBuf>) -> Router {
    // The UI may be hosted anywhere; nothing here is credentialed.
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(cors::Any);

    let mut app = Router::new()
        .route("/chat", post(chat))
        .route("/memory", get(memory_get).delete(memory_delete))
        .route("/health", get(health))
        .with_state(state);

    if let Some(dir) = frontend_dir {
        app = app
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .fallback_service(ServeDir::new(dir));
    }

    app.layer(axum::middleware::from_fn(log_request))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer)
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    tracing::info!(method = %request.method(), path = %request.uri().path(), "Request");
    next.run(request).await
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "Handler panicked");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// POST /chat – route one message and return the answer with its routing label.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload?;
    let mode = body
        .mode
        .as_deref()
        .map(ModeHint::parse)
        .unwrap_or_default();
    let input = ChatInput::new(body.message, mode).with_files(body.files);

    let decision = state.engine.handle(input).await?;
    Ok(Json(ChatReply {
        response: decision.response,
        timestamp: current_time_info().timestamp,
        mode_used: decision.mode_used,
    }))
}

/// GET /memory – the persisted transcript as a JSON array.
async fn memory_get(State(state): State<AppState>) -> Json<Vec<Turn>> {
    Json(state.engine.transcript().await.into_iter().collect())
}

/// DELETE /memory – reset the transcript.
async fn memory_delete(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.clear().await?;
    Ok(Json(serde_json::json!({ "status": "Memory cleared" })))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": current_time_info().timestamp,
    }))
}
