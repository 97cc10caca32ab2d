//! Client side of the chat proxy.
//!
//! Whatever happens on the wire, the widget ends up with a reply text: the
//! model's answer, or a Japanese sentence describing the failure.

use std::time::Duration;

use async_trait::async_trait;
use concierge_ipc::chat_request::ChatProxyRequest;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

pub const UPSTREAM_ERROR_PREFIX: &str = "申し訳ありません。エラーが発生しました: ";
pub const EMPTY_REPLY_MESSAGE: &str = "応答の生成に失敗しました。";
pub const TRANSPORT_ERROR_PREFIX: &str = "通信エラーが発生しました: ";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Sends one request to the chat proxy and returns its JSON body, whatever
/// the HTTP status.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatProxyRequest) -> Result<Value, TransportError>;
}

/// [`ChatTransport`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(Duration::from_secs(90)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatProxyRequest) -> Result<Value, TransportError> {
        debug!(endpoint = %self.endpoint, turns = request.history.len(), "Posting chat request");

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        serde_json::from_str(&body)
            .map_err(|e| TransportError::Decode(format!("HTTP {}: {}", status.as_u16(), e)))
    }
}

/// Turn a proxy answer into the text the visitor sees
pub fn reply_text(outcome: Result<Value, TransportError>) -> String {
    let body = match outcome {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Chat request failed");
            return format!("{}{}", TRANSPORT_ERROR_PREFIX, e);
        }
    };

    if let Some(err) = body.get("error").filter(|err| is_truthy(err)) {
        error!(details = %err, "API error");
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or("Unknown Error");
        return format!("{}{}", UPSTREAM_ERROR_PREFIX, message);
    }

    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| EMPTY_REPLY_MESSAGE.to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
