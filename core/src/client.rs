use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{GeminiError, GeminiResult};
use crate::types::*;

/// Default public endpoint of the generative-language API
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model; supports pay-as-you-go billing
pub const DEFAULT_MODEL_NAME: &str = "gemini-1.5-flash";

/// Upstream operations the proxy depends on.
///
/// The credential is passed per call so that the holder of the key (the
/// proxy configuration) stays the single source of truth for it.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate content and return the upstream JSON body untouched.
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> GeminiResult<Value>;

    /// List the models visible to the credential.
    async fn list_models(&self, api_key: &str) -> GeminiResult<ModelList>;

    /// Get the model name being used
    fn model_name(&self) -> String;
}

/// Client for interacting with the generative-language API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_base_url: String,
    model_name: String,
}

impl GeminiClient {
    /// Create a new API client
    pub fn new(api_base_url: Option<String>, model_name: Option<String>) -> GeminiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GeminiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model_name: model_name.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
        })
    }

    /// URL of the generateContent call for the configured model
    fn generate_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, self.model_name, api_key
        )
    }

    /// URL of the model listing call
    fn list_models_url(&self, api_key: &str) -> String {
        format!("{}/models?key={}", self.api_base_url, api_key)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> GeminiResult<Value> {
        debug!(model = %self.model_name, turns = request.contents.len(), "Calling generateContent");

        let response = self
            .client
            .post(self.generate_url(api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the message the API put in its error envelope, then the
            // HTTP reason phrase.
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            warn!(status = status.as_u16(), message = %message, "Upstream rejected request");
            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(body)
    }

    async fn list_models(&self, api_key: &str) -> GeminiResult<ModelList> {
        let response = self
            .client
            .get(self.list_models_url(api_key))
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to list models: {}", e)))?;

        let list = response
            .json::<ModelList>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse model list: {}", e)))?;

        Ok(list)
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }
}
