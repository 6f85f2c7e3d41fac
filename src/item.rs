// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Catalog item and search log data structures.
//!
//! [`Item`] is the unit the catalog stores and the engine returns. [`NewItem`]
//! is the ingestion shape (no id, no timestamps). [`SearchLogEntry`] records
//! one executed search and only ever feeds the analytics aggregations.
//!
//! # Example
//!
//! ```
//! use catalog_search::item::NewItem;
//!
//! let item = NewItem::new("Mechanical keyboard")
//!     .with_category("electronics")
//!     .with_price(89.0)
//!     .with_tags("keyboard,usb,rgb");
//!
//! assert!(item.validate().is_ok());
//! assert_eq!(item.popularity, 0);
//! ```

use serde::{Deserialize, Serialize};

/// Maximum title length accepted on ingest (matches the `title` column width).
pub const MAX_TITLE_LEN: usize = 255;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A catalog item as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Store-assigned identifier
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Comma-joined keyword list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Popularity counter, also used as the relevance proxy
    pub popularity: i64,
    /// Creation timestamp (epoch millis)
    pub created_at: i64,
    /// Last update timestamp (epoch millis)
    pub updated_at: i64,
}

/// An item waiting to be inserted into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub popularity: i64,
    /// Explicit creation time; the store stamps "now" when absent
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: None,
            tags: None,
            price: None,
            popularity: 0,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_popularity(mut self, popularity: i64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Check the catalog invariants before the item reaches a store.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(format!("title exceeds {} characters", MAX_TITLE_LEN));
        }
        if self.popularity < 0 {
            return Err("popularity must be non-negative".to_string());
        }
        if let Some(price) = self.price {
            if !(price >= 0.0) {
                return Err("price must be a non-negative number".to_string());
            }
        }
        Ok(())
    }

    /// Category with empty and whitespace-only labels collapsed to `None`.
    pub fn normalized_category(&self) -> Option<String> {
        normalize_category(self.category.as_deref())
    }

    /// Materialize into an [`Item`] with the given id and insertion time.
    pub fn into_item(self, id: i64, now: i64) -> Item {
        let category = self.normalized_category();
        let created_at = self.created_at.unwrap_or(now);
        Item {
            id,
            title: self.title,
            description: self.description,
            category,
            tags: self.tags,
            price: self.price,
            popularity: self.popularity,
            created_at,
            updated_at: created_at.max(now),
        }
    }
}

/// Collapse empty/blank category labels into the single "absent" sentinel.
pub fn normalize_category(category: Option<&str>) -> Option<String> {
    match category {
        Some(c) if !c.trim().is_empty() => Some(c.to_string()),
        _ => None,
    }
}

/// One executed search, as recorded in the search log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogEntry {
    /// Raw keyword as submitted
    pub query: String,
    /// Total matches (pre-pagination)
    pub result_count: u64,
    pub response_time_ms: f64,
    /// Epoch millis
    pub created_at: i64,
}

impl SearchLogEntry {
    pub fn new(query: impl Into<String>, result_count: u64, response_time_ms: f64) -> Self {
        Self {
            query: query.into(),
            result_count,
            response_time_ms,
            created_at: now_millis(),
        }
    }
}
