use serde::{Deserialize, Serialize};

/// Role attached to a user turn
pub const ROLE_USER: &str = "user";
/// Role attached to a model turn
pub const ROLE_MODEL: &str = "model";

/// Request to the generative-language API to generate content.
///
/// Field names are sent in snake_case; the upstream accepts both casings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
}

/// Content structure for requests
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    /// System instruction content: a single text part without a role.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: None,
        }
    }
}

/// Part structure for a piece of content
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// Base64 payload attached to a part (camera captures)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Response from the generative-language API
#[derive(Deserialize, Debug, Serialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Candidate in the response
#[derive(Deserialize, Debug, Serialize)]
pub struct Candidate {
    pub content: Option<ContentResponsePart>,
}

/// Content part in the response
#[derive(Deserialize, Debug, Serialize)]
pub struct ContentResponsePart {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
    pub role: Option<String>,
}

/// Part response from the API
#[derive(Deserialize, Debug, Serialize)]
pub struct PartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Error envelope returned by the API (and relayed by the proxy)
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

impl ApiErrorEnvelope {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                message: Some(message.into()),
                code: None,
                status: None,
            },
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Response of the model listing endpoint
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ModelList {
    #[serde(default)]
    pub models: Option<Vec<ModelInfo>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_snake_case_and_skips_empty_fields() {
        let request = GenerateContentRequest {
            system_instruction: Some(Content::system("persona")),
            contents: vec![Content {
                parts: vec![Part::text("hi"), Part::inline_data("image/png", "AAAA")],
                role: Some(ROLE_USER.to_string()),
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "system_instruction": { "parts": [{ "text": "persona" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "hi" },
                        { "inline_data": { "mime_type": "image/png", "data": "AAAA" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn first_text_walks_the_candidate_tree() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "こんにちは" }] } }]
        }))
        .unwrap();
        assert_eq!(response.first_text(), Some("こんにちは"));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_text(), None);

        let no_content: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [{}] })).unwrap();
        assert_eq!(no_content.first_text(), None);
    }
}
