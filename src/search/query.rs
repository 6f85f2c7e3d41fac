// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search request value object.
//!
//! [`SearchQuery`] is built once per request and never mutated by the engine.
//! Sort and order strings are parsed laxly: an unknown sort key falls back to
//! [`SortKey::Relevance`] and anything other than the literal `asc` is
//! descending.
//!
//! # Example
//!
//! ```rust
//! use catalog_search::search::{SearchQuery, SortKey, SortOrder};
//!
//! let query = SearchQuery::new("laptop")
//!     .category("electronics")
//!     .price_range(Some(500.0), Some(1500.0))
//!     .sort(SortKey::Price)
//!     .order(SortOrder::Asc)
//!     .page(2)
//!     .size(10);
//!
//! assert_eq!(query.offset(), 10);
//! assert_eq!(SortOrder::from("dsc"), SortOrder::Desc);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::engine::SearchError;

/// Default page size when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Requested sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortKey {
    /// Popularity descending, standing in for text relevance
    #[default]
    Relevance,
    /// `created_at`
    Date,
    /// `popularity`
    Popularity,
    /// `price`
    Price,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::Popularity => "popularity",
            Self::Price => "price",
        }
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        match value {
            "date" => Self::Date,
            "popularity" => Self::Popularity,
            "price" => Self::Price,
            _ => Self::Relevance,
        }
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<SortKey> for String {
    fn from(value: SortKey) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl From<&str> for SortOrder {
    fn from(value: &str) -> Self {
        // Only the literal ascending token flips the direction.
        if value == "asc" {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<SortOrder> for String {
    fn from(value: SortOrder) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text keyword, matched as a literal substring
    pub keyword: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 { 1 }
fn default_size() -> u32 { DEFAULT_PAGE_SIZE }

impl SearchQuery {
    /// Query with default sort (relevance, descending), page 1 and size 20.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: None,
            min_price: None,
            max_price: None,
            sort: SortKey::default(),
            order: SortOrder::default(),
            page: default_page(),
            size: default_size(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn min_price(mut self, min: f64) -> Self {
        self.min_price = Some(min);
        self
    }

    pub fn max_price(mut self, max: f64) -> Self {
        self.max_price = Some(max);
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn sort(mut self, sort: impl Into<SortKey>) -> Self {
        self.sort = sort.into();
        self
    }

    pub fn order(mut self, order: impl Into<SortOrder>) -> Self {
        self.order = order.into();
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Rows to skip for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }

    /// Boundary validation for callers that accept raw parameters.
    ///
    /// The engine never calls this; it trusts the query it is given.
    /// `min_price <= max_price` is not checked.
    pub fn validate(&self, config: &SearchConfig) -> Result<(), SearchError> {
        let len = self.keyword.chars().count();
        if len == 0 || len > config.max_keyword_len {
            return Err(SearchError::InvalidQuery(format!(
                "keyword must be between 1 and {} characters",
                config.max_keyword_len
            )));
        }
        for (name, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = bound {
                if !(value >= 0.0) {
                    return Err(SearchError::InvalidQuery(format!("{} must be non-negative", name)));
                }
            }
        }
        if self.page < 1 {
            return Err(SearchError::InvalidQuery("page must be at least 1".to_string()));
        }
        if self.size < 1 || self.size > config.max_page_size {
            return Err(SearchError::InvalidQuery(format!(
                "size must be between 1 and {}",
                config.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = SearchQuery::new("phone");
        assert_eq!(query.sort, SortKey::Relevance);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.page, 1);
        assert_eq!(query.size, 20);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_lax_sort_parsing() {
        assert_eq!(SortKey::from("date"), SortKey::Date);
        assert_eq!(SortKey::from("popularity"), SortKey::Popularity);
        assert_eq!(SortKey::from("price"), SortKey::Price);
        assert_eq!(SortKey::from("relevance"), SortKey::Relevance);
        assert_eq!(SortKey::from("bogus"), SortKey::Relevance);
        assert_eq!(SortKey::from("Price"), SortKey::Relevance);
    }

    #[test]
    fn test_lax_order_parsing() {
        assert_eq!(SortOrder::from("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::from("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::from("dsc"), SortOrder::Desc);
        assert_eq!(SortOrder::from("ASC"), SortOrder::Desc);
        assert_eq!(SortOrder::from(""), SortOrder::Desc);
    }

    #[test]
    fn test_offset() {
        let query = SearchQuery::new("x").page(3).size(25);
        assert_eq!(query.offset(), 50);
    }

    #[test]
    fn test_deserialize_with_lax_values() {
        let query: SearchQuery = serde_json::from_value(serde_json::json!({
            "keyword": "tv",
            "sort": "whatever",
            "order": "up",
        }))
        .unwrap();
        assert_eq!(query.sort, SortKey::Relevance);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.page, 1);
        assert_eq!(query.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_serialize_round_trips_names() {
        let query = SearchQuery::new("tv").sort(SortKey::Price).order(SortOrder::Asc);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["sort"], "price");
        assert_eq!(json["order"], "asc");
    }

    #[test]
    fn test_validate() {
        let config = SearchConfig::default();
        assert!(SearchQuery::new("ok").validate(&config).is_ok());
        assert!(SearchQuery::new("").validate(&config).is_err());
        assert!(SearchQuery::new("x".repeat(256)).validate(&config).is_err());
        assert!(SearchQuery::new("ok").page(0).validate(&config).is_err());
        assert!(SearchQuery::new("ok").size(0).validate(&config).is_err());
        assert!(SearchQuery::new("ok").size(101).validate(&config).is_err());
        assert!(SearchQuery::new("ok").size(100).validate(&config).is_ok());
        assert!(SearchQuery::new("ok").min_price(-1.0).validate(&config).is_err());
        // Inverted ranges are the caller's business
        assert!(SearchQuery::new("ok")
            .price_range(Some(10.0), Some(1.0))
            .validate(&config)
            .is_ok());
    }

    #[test]
    fn test_validate_reports_invalid_query() {
        let config = SearchConfig::default();
        match SearchQuery::new("ok").size(500).validate(&config) {
            Err(SearchError::InvalidQuery(message)) => {
                assert_eq!(message, "size must be between 1 and 100");
            }
            other => panic!("expected InvalidQuery, got {:?}", other),
        }
    }
}
