use concierge_core::types::{ApiErrorEnvelope, Content, Part};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry of the conversation history, already in the upstream
/// `{role, parts:[{text}]}` shape so the proxy can forward it as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Text of the first part, empty when the turn carries none
    pub fn text(&self) -> &str {
        self.parts
            .first()
            .and_then(|part| part.text.as_deref())
            .unwrap_or("")
    }
}

impl From<ConversationTurn> for Content {
    fn from(turn: ConversationTurn) -> Self {
        Content {
            parts: turn.parts,
            role: Some(turn.role.as_str().to_string()),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatProxyRequest {
    pub history: Vec<ConversationTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Error body the proxy answers with: `{"error":{"message":...}}`
pub type ProxyErrorBody = ApiErrorEnvelope;
