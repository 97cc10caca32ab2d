use crate::config::ProxySettings;
use crate::error::ProxyError;
use crate::relay;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use concierge_core::client::GenerativeBackend;
use concierge_ipc::chat_request::ChatProxyRequest;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    settings: Arc<ProxySettings>,
    backend: Arc<dyn GenerativeBackend>,
}

impl AppState {
    pub fn new(settings: ProxySettings, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            settings: Arc::new(settings),
            backend,
        }
    }
}

/// Build the router: `POST /api/chat` and `GET /health`, CORS open to any
/// origin.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(handle_chat).fallback(method_not_allowed))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "Concierge proxy is running"
}

async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}

/// Handler for chat requests
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatProxyRequest>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    let Some(api_key) = state.settings.api_key() else {
        return Err(ProxyError::MissingApiKey);
    };

    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected chat request body");
        ProxyError::BadRequest(rejection.body_text())
    })?;

    let body = relay::relay(state.backend.as_ref(), api_key, request).await?;
    Ok(Json(body))
}
