// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::item::{Item, NewItem, SearchLogEntry};
use crate::search::{Predicate, SortSpec};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage connection error: {0}")]
    Connection(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

/// Item count for one category label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Aggregates for one distinct logged query string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAggregate {
    pub query: String,
    /// Number of log entries with exactly this text
    pub count: u64,
    pub avg_response_ms: f64,
    /// Most recent occurrence (epoch millis)
    pub last_searched: i64,
}

/// Whole-log aggregates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LogTotals {
    pub searches: u64,
    /// 0 when the log is empty
    pub avg_response_ms: f64,
}

/// Read/write access to the item catalog.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Count items matching `predicate` (no pagination).
    async fn count_matching(&self, predicate: &Predicate) -> Result<u64, StorageError>;

    /// Fetch one sorted page of items matching `predicate`.
    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Item>, StorageError>;

    /// Up to `limit` distinct titles of matching items, in store order.
    async fn distinct_titles(&self, predicate: &Predicate, limit: usize) -> Result<Vec<String>, StorageError>;

    /// Matching items grouped by category, count descending then label
    /// ascending. NULL and empty categories are left out.
    async fn category_counts(&self, predicate: &Predicate) -> Result<Vec<CategoryCount>, StorageError>;

    /// Count total items in the catalog.
    async fn count_all(&self) -> Result<u64, StorageError>;

    /// Insert one item and return it with its assigned id.
    async fn insert_item(&self, item: &NewItem) -> Result<Item, StorageError>;

    /// Insert a batch of items.
    /// Default implementation falls back to sequential inserts.
    async fn insert_items(&self, items: &[NewItem]) -> Result<usize, StorageError> {
        for item in items {
            self.insert_item(item).await?;
        }
        Ok(items.len())
    }
}

/// Append-only search log plus the aggregations read from it.
#[async_trait]
pub trait SearchLogStore: Send + Sync {
    /// Append one entry in its own transaction (rolled back on failure).
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), StorageError>;

    /// Distinct queries by frequency: count descending, then query ascending.
    async fn top_queries(&self, limit: usize) -> Result<Vec<QueryAggregate>, StorageError>;

    /// Distinct queries by most recent occurrence, newest first.
    async fn recent_queries(&self, limit: usize) -> Result<Vec<String>, StorageError>;

    /// Distinct queries containing `fragment`, other than `exclude`, by
    /// frequency descending.
    async fn queries_containing(
        &self,
        fragment: &str,
        exclude: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError>;

    /// Aggregates for one exact query string, `None` if never logged.
    async fn query_aggregate(&self, query: &str) -> Result<Option<QueryAggregate>, StorageError>;

    /// Total number of logged searches and their mean response time.
    async fn totals(&self) -> Result<LogTotals, StorageError>;
}
