mod types;

pub use types::{ChatProxyRequest, ConversationTurn, ProxyErrorBody, Role};
