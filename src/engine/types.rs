// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types returned by the search engine.

use serde::Serialize;
use thiserror::Error;

use crate::item::Item;
use crate::storage::traits::{CategoryCount, StorageError};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result of [`super::SearchEngine::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// The requested page
    pub items: Vec<Item>,
    /// Matches before pagination
    pub total: u64,
    /// Wall-clock time of predicate, count and page fetch
    pub elapsed_ms: f64,
}

/// A result item with its highlighted title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedItem {
    #[serde(flatten)]
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// Full response for a search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
    pub items: Vec<HighlightedItem>,
    pub response_time_ms: f64,
    pub facets: Facets,
    pub search_id: String,
    /// No result cache exists, so always `false`
    pub cache_hit: bool,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Suggestions {
    /// Most frequent distinct queries
    pub popular: Vec<String>,
    /// Most recently issued distinct queries
    pub recent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Facets {
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
    /// Epoch millis of the latest occurrence
    pub last_searched: i64,
}

/// Per-query analytics. `user_agent` and `ip_address` are never captured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAnalytics {
    pub query: String,
    pub search_count: u64,
    /// Items whose title currently contains the query
    pub result_count: u64,
    pub response_time_ms: f64,
    pub timestamp: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl SearchAnalytics {
    /// Analytics for a query with no recorded history.
    pub fn empty(query: impl Into<String>, timestamp: i64) -> Self {
        Self {
            query: query.into(),
            search_count: 0,
            result_count: 0,
            response_time_ms: 0.0,
            timestamp,
            user_agent: None,
            ip_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopQuery {
    pub query: String,
    pub count: u64,
    pub avg_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStats {
    pub total_items: u64,
    pub total_searches: u64,
    pub avg_response_time_ms: f64,
    pub popular_queries: Vec<TopQuery>,
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Number of pages needed for `total` rows at `size` per page.
pub fn total_pages(total: u64, size: u32) -> u64 {
    if size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(size))
}
