use concierge_ipc::chat_request::ConversationTurn;
use serde::{Deserialize, Serialize};

use crate::theme::DEFAULT_THEME_COLOR;

/// Per-page widget state, owned by the controller and handed to every
/// handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Append-only conversation, oldest first
    pub history: Vec<ConversationTurn>,
    pub avatar_visible: bool,
    pub transparent: bool,
    pub tts_enabled: bool,
    pub chat_open: bool,
    /// Current accent colour
    pub theme_color: String,
    pub theme_picker_open: bool,
    /// Product name the assistant last pointed at, for これ/それ/あれ
    pub last_mentioned_product: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            avatar_visible: true,
            transparent: false,
            tts_enabled: false,
            chat_open: false,
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            theme_picker_open: false,
            last_mentioned_product: None,
        }
    }
}

impl SessionState {
    pub fn push(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}
