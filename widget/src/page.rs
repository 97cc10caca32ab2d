//! Page content snapshot handed to the model as grounding data.
//!
//! The storefront markup is reached through [`PageContentProvider`]; the
//! provider reports what the page shows for each marker the widget knows
//! (`[data-menu-card]` with `.menu-title`/`.menu-description`/`.menu-price`,
//! `[data-store-info]`, `[data-faq-item]` with `.faq-question`/`.faq-answer`).

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{Result, WidgetError};

/// Site name used when the page has no title
pub const DEFAULT_SITE_NAME: &str = "Miryu Burger Demo";

/// Image used when a menu card has none
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/300x200?text=No+Image";

/// One `[data-menu-card]` element as the page renders it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuCard {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    /// `src` of the card image
    #[serde(default)]
    pub image: Option<String>,
    /// `.menu-tags li` entries
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One `[data-faq-item]` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaqElement {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Read-only access to the visible page.
pub trait PageContentProvider: Send + Sync {
    /// Document title
    fn title(&self) -> Option<String>;

    /// Menu cards in document order
    fn menu_cards(&self) -> Vec<MenuCard>;

    /// Rendered text of the store info block, if the page has one
    fn store_info_text(&self) -> Option<String>;

    /// FAQ entries in document order
    fn faq_items(&self) -> Vec<FaqElement>;

    /// Value of the page's `--primary-color` custom property
    fn primary_color_var(&self) -> Option<String> {
        None
    }

    /// Computed background colour of the page `<header>`
    fn header_background(&self) -> Option<String> {
        None
    }
}

/// A page described in a TOML or JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub store_info: Option<String>,
    #[serde(default, rename = "menu")]
    pub menu_cards: Vec<MenuCard>,
    #[serde(default, rename = "faq")]
    pub faq_items: Vec<FaqElement>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub header_background: Option<String>,
}

impl StaticPage {
    /// Load a page description; `.json` files are read as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            toml::from_str(&content)
                .map_err(|e| WidgetError::Page(format!("Failed to parse {}: {}", path.display(), e)))
        }
    }
}

impl PageContentProvider for StaticPage {
    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn menu_cards(&self) -> Vec<MenuCard> {
        self.menu_cards.clone()
    }

    fn store_info_text(&self) -> Option<String> {
        self.store_info.clone()
    }

    fn faq_items(&self) -> Vec<FaqElement> {
        self.faq_items.clone()
    }

    fn primary_color_var(&self) -> Option<String> {
        self.primary_color.clone()
    }

    fn header_background(&self) -> Option<String> {
        self.header_background.clone()
    }
}

/// Question/answer pair as sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<String>,
}

/// Menu item as sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: String,
}

/// Snapshot of the visible page. Rebuilt for every prompt, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub site_name: String,
    pub store_info: String,
    pub faq: Vec<FaqEntry>,
    pub items: Vec<PageItem>,
}

/// Positional item identifier, `menu_<index+1>`
pub fn item_id(index: usize) -> String {
    format!("menu_{}", index + 1)
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("valid regex"))
}

/// Scrape the page. `None` when there are no menu items, no store info and
/// no FAQ entries; otherwise the missing parts are empty.
pub fn collect_page_context(page: &dyn PageContentProvider) -> Option<PageContext> {
    let items: Vec<PageItem> = page
        .menu_cards()
        .iter()
        .enumerate()
        .map(|(index, card)| PageItem {
            id: item_id(index),
            name: trimmed(&card.title),
            description: trimmed(&card.description),
            price: trimmed(&card.price),
            image: card
                .image
                .clone()
                .filter(|src| !src.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        })
        .collect();

    let store_info = page
        .store_info_text()
        .map(|text| newline_runs().replace_all(&text, " ").trim().to_string())
        .unwrap_or_default();

    let faq: Vec<FaqEntry> = page
        .faq_items()
        .iter()
        .map(|item| FaqEntry {
            q: item.question.as_deref().map(|q| q.trim().to_string()),
            a: item.answer.as_deref().map(|a| a.trim().to_string()),
        })
        .collect();

    if items.is_empty() && store_info.is_empty() && faq.is_empty() {
        return None;
    }

    Some(PageContext {
        site_name: page
            .title()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        store_info,
        faq,
        items,
    })
}
