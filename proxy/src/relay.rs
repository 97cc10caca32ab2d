//! Forwarding one chat request to the hosted model.

use std::sync::OnceLock;

use concierge_core::client::GenerativeBackend;
use concierge_core::types::{Content, GenerateContentRequest, Part};
use concierge_ipc::chat_request::{ChatProxyRequest, Role};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{ProxyError, Result};

/// Replaces the text of the user turn an image is attached to
pub const IMAGE_PROMPT_TEXT: &str =
    "お客様が撮影した画像です。内容を説明し、もしメニューや商品が分かれば教えてください。";

/// Every attached image is declared as PNG
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Placeholder when the model listing has no `models` field
pub const MODELS_LOOKUP_FAILED: &str = "Models lookup failed";

fn data_url_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:image/(png|jpeg|jpg);base64,").expect("valid regex"))
}

/// Raw base64 payload of an image data URL
pub fn strip_data_url_prefix(image: &str) -> &str {
    match data_url_prefix_re().find(image) {
        Some(prefix) => &image[prefix.end()..],
        None => image,
    }
}

/// Upstream payload for a widget request. An image replaces the parts of
/// the last turn when that turn is the visitor's; otherwise it is dropped.
pub fn build_payload(request: ChatProxyRequest) -> GenerateContentRequest {
    let ChatProxyRequest {
        mut history,
        image_base64,
        system_prompt,
    } = request;

    if let Some(image) = image_base64.as_deref().filter(|image| !image.is_empty()) {
        match history.last_mut() {
            Some(last) if last.role == Role::User => {
                last.parts = vec![
                    Part::text(IMAGE_PROMPT_TEXT),
                    Part::inline_data(IMAGE_MIME_TYPE, strip_data_url_prefix(image)),
                ];
            }
            _ => warn!("Image received without a trailing user turn, ignoring it"),
        }
    }

    GenerateContentRequest {
        system_instruction: Some(Content::system(system_prompt.unwrap_or_default())),
        contents: history.into_iter().map(Content::from).collect(),
    }
}

/// Relay the request. On failure the model listing is consulted and folded
/// into the error message.
pub async fn relay(backend: &dyn GenerativeBackend, api_key: &str, request: ChatProxyRequest) -> Result<Value> {
    let payload = build_payload(request);
    debug!(turns = payload.contents.len(), model = %backend.model_name(), "Relaying chat request");

    match backend.generate_content(api_key, &payload).await {
        Ok(body) => Ok(body),
        Err(e) => {
            error!(error = %e, "Upstream call failed");
            let message = e.upstream_message();
            Err(ProxyError::Upstream(diagnose(backend, api_key, &message).await))
        }
    }
}

/// Error text for a failed generation, with the models the key can see
pub async fn diagnose(backend: &dyn GenerativeBackend, api_key: &str, message: &str) -> String {
    match backend.list_models(api_key).await {
        Ok(list) => {
            let available = match list.models {
                Some(models) => models
                    .iter()
                    .map(|model| model.name.as_str())
                    .filter(|name| name.contains("gemini"))
                    .collect::<Vec<_>>()
                    .join(", "),
                None => MODELS_LOOKUP_FAILED.to_string(),
            };
            format!(
                "(v4) Model Error: {}. \n\n[Check Billing]: Ensure your GCP project has billing enabled to avoid 'free_tier_requests' errors. \nAvailable Models: [{}]",
                message, available
            )
        }
        Err(e) => {
            warn!(error = %e, "Model listing failed");
            format!("(v3) {} (Failed to list models)", message)
        }
    }
}
