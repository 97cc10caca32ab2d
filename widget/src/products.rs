//! Product cards: what the model recommends and what the page knows.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::page::{item_id, PageContentProvider, PageItem};

/// Detail view body for a product without a description
pub const NO_DETAIL_TEXT: &str = "詳細情報はありません。";

/// Everything a rendered product card shows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCardData {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub detail_text: String,
}

impl ProductCardData {
    /// Body of the detail view
    pub fn detail_body(&self) -> &str {
        if self.description.trim().is_empty() {
            NO_DETAIL_TEXT
        } else {
            &self.description
        }
    }
}

impl From<&PageItem> for ProductCardData {
    fn from(item: &PageItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price.clone(),
            description: item.description.clone(),
            image_url: item.image.clone(),
            tags: Vec::new(),
            detail_text: item.description.clone(),
        }
    }
}

/// One entry of the model's `products` array. Every field is optional; the
/// model is told to leave `imageUrl` empty when it does not know it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProduct {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub detail_text: Option<String>,
}

impl RecommendedProduct {
    /// Lay the fields the model supplied over `base`
    fn overlay(&self, mut base: ProductCardData) -> ProductCardData {
        if let Some(id) = &self.id {
            base.id = id.clone();
        }
        if let Some(name) = &self.name {
            base.name = name.clone();
        }
        if let Some(price) = &self.price {
            base.price = price.clone();
        }
        if let Some(description) = &self.description {
            base.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            base.image_url = image_url.clone();
        }
        if let Some(tags) = &self.tags {
            base.tags = tags.clone();
        }
        if let Some(detail_text) = &self.detail_text {
            base.detail_text = detail_text.clone();
        }
        base
    }
}

/// Accepts strings and numbers (models write `"price": 500` as often as
/// `"price": "500"`).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// A bare string counts as a single tag; non-string list items are skipped.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(vec![s]),
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Parsed fenced JSON block of a reply
#[derive(Debug, Clone, PartialEq)]
pub struct ProductBlock {
    /// The block exactly as parsed
    pub raw: Value,
}

impl ProductBlock {
    /// Entries of the `products` array that look like products. Anything
    /// else in the block is ignored.
    pub fn products(&self) -> Vec<RecommendedProduct> {
        self.raw
            .get("products")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match serde_json::from_value(item.clone()) {
                        Ok(product) => Some(product),
                        Err(e) => {
                            warn!(error = %e, entry = %item, "Skipping malformed product entry");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Products found on the page, keyed by positional id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductRegistry {
    items: BTreeMap<String, ProductCardData>,
    order: Vec<String>,
}

impl ProductRegistry {
    /// Build the registry from the page's menu cards
    pub fn from_page(page: &dyn PageContentProvider) -> Self {
        let mut registry = Self::default();
        for (index, card) in page.menu_cards().iter().enumerate() {
            let description = card.description.as_deref().unwrap_or("").trim().to_string();
            let product = ProductCardData {
                id: item_id(index),
                name: card.title.as_deref().unwrap_or("").trim().to_string(),
                price: card.price.as_deref().unwrap_or("").trim().to_string(),
                image_url: card.image.clone().unwrap_or_default(),
                tags: card.tags.iter().map(|tag| tag.trim().to_string()).collect(),
                detail_text: description.clone(),
                description,
            };
            registry.insert(product);
        }
        registry
    }

    pub fn insert(&mut self, product: ProductCardData) {
        if !self.items.contains_key(&product.id) {
            self.order.push(product.id.clone());
        }
        self.items.insert(product.id.clone(), product);
    }

    pub fn get(&self, id: &str) -> Option<&ProductCardData> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Products in page order
    pub fn iter(&self) -> impl Iterator<Item = &ProductCardData> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ProductCardData> {
        self.iter().find(|product| product.name == name)
    }

    /// Resolve a model recommendation against the page. On a name match the
    /// registry entry is the base, the model's fields override it, and the
    /// registry keeps the final say on `imageUrl` (when it has one) and `id`.
    pub fn merge(&self, recommended: &RecommendedProduct) -> ProductCardData {
        let matched = recommended
            .name
            .as_deref()
            .and_then(|name| self.find_by_name(name));

        match matched {
            Some(entry) => {
                let mut product = recommended.overlay(entry.clone());
                if !entry.image_url.is_empty() {
                    product.image_url = entry.image_url.clone();
                }
                product.id = entry.id.clone();
                product
            }
            None => recommended.overlay(ProductCardData::default()),
        }
    }

    /// Longest product name contained in `text`
    pub fn find_mentioned(&self, text: &str) -> Option<&ProductCardData> {
        let mut candidates: Vec<&ProductCardData> =
            self.iter().filter(|product| !product.name.is_empty()).collect();
        candidates.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));
        candidates.into_iter().find(|product| text.contains(&product.name))
    }
}
