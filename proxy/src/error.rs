use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use concierge_ipc::chat_request::ProxyErrorBody;
use thiserror::Error;
use tracing::error;

/// Failures the chat endpoint reports as `{"error":{"message":...}}`
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error("Server Configuration Error: API Key missing")]
    MissingApiKey,

    /// Upstream failure, already annotated with diagnostics
    #[error("{0}")]
    Upstream(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingApiKey | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Chat request failed");
        }
        (status, Json(ProxyErrorBody::with_message(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
