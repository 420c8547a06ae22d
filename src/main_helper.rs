use crate::dispatch::ChatEngine;
use crate::hardening::RetryPolicy;
use crate::ingress::{validate_chat_request, RawChatRequest, ResetRequest};
use crate::model::GenerativeModel;
use crate::registry::{ToolListing, ToolRegistry};
use crate::session::SessionStore;
use crate::specs::mcp::JsonRpcRequest;
use crate::tools::{builtin_registry, ToolsConfig};
use crate::types::*;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value = crate::constants::DEFAULT_MODEL_NAME)]
    pub model_name: String,
    #[arg(long, default_value = crate::constants::GEMINI_BASE_URL)]
    pub gemini_base_url: String,
    #[arg(long, default_value_t = crate::constants::DEFAULT_MAX_TURNS)]
    pub max_turns: u32,
    #[arg(long, default_value_t = crate::constants::DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[arg(long, default_value_t = crate::constants::DEFAULT_BASE_DELAY_MS)]
    pub base_delay_ms: u64,
    #[arg(long, default_value_t = crate::constants::DEFAULT_MAX_DELAY_MS)]
    pub max_delay_ms: u64,
    #[arg(long, default_value_t = crate::constants::DEFAULT_BACKOFF_FACTOR)]
    pub backoff_factor: f64,
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    /// Per tool invocation; 0 disables the limit.
    #[arg(long, default_value_t = 60)]
    pub tool_timeout_secs: u64,
    #[arg(long, default_value = ".")]
    pub sandbox_root: PathBuf,
    #[arg(long, default_value = "notepad.txt")]
    pub notepad_path: PathBuf,
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_size: usize,
    /// Consecutive model failures after which /readyz reports unready; 0 never does.
    #[arg(long, default_value_t = 5)]
    pub degraded_threshold: u32,
    /// Sessions kept in memory; the least recently used idle one is evicted past this.
    #[arg(long, default_value_t = crate::constants::DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,
    /// Idle sessions older than this are swept; 0 disables the sweep.
    #[arg(long, default_value_t = crate::constants::DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: u64,
}

impl Args {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.backoff_factor,
        )
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        match self.tool_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn session_idle_ttl(&self) -> Option<Duration> {
        match self.session_idle_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub sessions: Arc<SessionStore>,
    pub registry: Arc<ToolRegistry>,
    pub health: Arc<TransportHealth>,
    pub args: Arc<Args>,
}

impl AppState {
    /// Wires the built-in tools and the chat engine around `model`.
    pub fn build(
        args: Arc<Args>,
        model: Arc<dyn GenerativeModel>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let registry = Arc::new(builtin_registry(&ToolsConfig {
            sandbox_root: args.sandbox_root.clone(),
            notepad_path: args.notepad_path.clone(),
            client,
            timeout: args.tool_timeout(),
        })?);
        let health = Arc::new(TransportHealth::default());
        let engine = ChatEngine::new(model, registry.clone())
            .with_retry(args.retry_policy())
            .with_max_turns(args.max_turns)
            .with_health(health.clone());

        Ok(Self {
            engine: Arc::new(engine),
            sessions: Arc::new(SessionStore::with_capacity(args.max_sessions)),
            registry,
            health,
            args,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/session/reset", post(reset_handler))
        .route("/tools", get(tools_handler))
        .route("/mcp", post(mcp_handler))
        .route("/health", get(crate::health::liveness))
        .route("/readyz", get(crate::health::readiness))
        .layer(axum::extract::DefaultBodyLimit::max(state.args.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(crate::logging::request_id_middleware))
                .layer(cors),
        )
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub session_id: SessionId,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawChatRequest>,
) -> Result<Json<ChatReply>> {
    let (session_id, request) = validate_chat_request(raw)?;
    tracing::info!(
        "[💬] Chat for session {} (prompt_len: {}, persona: {})",
        session_id.short(),
        request.prompt.len(),
        request.persona.is_some()
    );

    let handle = state.sessions.handle(&session_id).await;
    let mut slot = handle.lock().await;
    let chat = state.engine.process_chat(&mut *slot, request).await?;

    Ok(Json(ChatReply { chat, session_id }))
}

pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Json<serde_json::Value> {
    let id = SessionId::from(req.session_id);
    if !state.sessions.remove(&id).await {
        tracing::debug!("Reset requested for unknown session {}", id.short());
    }
    Json(serde_json::json!({ "status": "cleared" }))
}

pub async fn tools_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ToolListing>> {
    Json(state.registry.definitions().map(|d| d.listing()).collect())
}

pub async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    match crate::mcp::handle_rpc(&state.registry, request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
