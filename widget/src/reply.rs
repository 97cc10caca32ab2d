//! Splits a model reply into visitor-facing prose and the structured blocks
//! the model embeds by convention:
//!
//! - a fenced code block (optionally tagged `json`) carrying `{"products":[...]}`
//! - a `[[PROFILE_DELTA: {...} ]]` marker carrying a partial profile update
//!
//! A block is stripped only when its JSON parses. Malformed blocks are
//! logged and left in the text.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::products::ProductBlock;
use crate::profile::ProfileDelta;

fn product_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"))
}

fn profile_delta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[PROFILE_DELTA:\s*([\s\S]*?)\]\]").expect("valid regex"))
}

/// Result of [`parse_reply`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReply {
    /// Text shown to the visitor
    pub display_text: String,
    pub product_block: Option<ProductBlock>,
    pub profile_delta: Option<ProfileDelta>,
    /// Reply with only the delta removed; this is what the history keeps
    pub history_text: String,
}

/// Remove the first fenced JSON block when it parses.
pub fn extract_product_block(text: &str) -> (String, Option<ProductBlock>) {
    let Some(captures) = product_block_re().captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
        return (text.to_string(), None);
    };

    match serde_json::from_str::<Value>(body.as_str()) {
        Ok(raw) => {
            let residual = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
            debug!("Extracted product block");
            (residual.trim().to_string(), Some(ProductBlock { raw }))
        }
        Err(e) => {
            warn!(error = %e, "JSON parse error in product block");
            (text.to_string(), None)
        }
    }
}

/// Remove the first `PROFILE_DELTA` marker when its JSON parses as a delta.
pub fn extract_profile_delta(text: &str) -> (String, Option<ProfileDelta>) {
    let Some(captures) = profile_delta_re().captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
        return (text.to_string(), None);
    };

    match serde_json::from_str::<ProfileDelta>(body.as_str()) {
        Ok(delta) => {
            let residual = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
            debug!(?delta, "Extracted profile delta");
            (residual.trim().to_string(), Some(delta))
        }
        Err(e) => {
            warn!(error = %e, "Delta parse error");
            (text.to_string(), None)
        }
    }
}

/// Parse a raw reply. Pure: applying the delta is the caller's job.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let (history_text, profile_delta) = extract_profile_delta(raw);
    let (without_products, product_block) = extract_product_block(raw);
    let display_text = if profile_delta.is_some() {
        extract_profile_delta(&without_products).0
    } else {
        without_products
    };

    ParsedReply {
        display_text,
        product_block,
        profile_delta,
        history_text,
    }
}

/// Text handed to speech synthesis: the reply without its product block,
/// whether or not the block parses.
pub fn speech_text(text: &str) -> String {
    product_block_re().replace(text, "").trim().to_string()
}
