// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search engine: query execution plus the analytics read paths.
//!
//! # Architecture
//!
//! ```text
//! search(query)
//!       │
//!       ├─→ build_predicate / sort_spec
//!       │
//!       ├─→ ItemStore::count_matching      (total, pre-pagination)
//!       ├─→ ItemStore::find_matching       (one sorted page)
//!       │        │
//!       │        └─→ Err? propagate as SearchError::Storage
//!       │
//!       └─→ SearchLogStore::append         (best-effort, never fails search)
//! ```
//!
//! The `impl SearchEngine` is split across files:
//! - this file: construction and `search`
//! - `analytics_api`: autocomplete, suggestions, facets, stats
//! - `response_api`: full response assembly

mod analytics_api;
mod response_api;
mod types;

pub use types::{
    round2, total_pages, Facets, HighlightedItem, PopularQuery, SearchAnalytics, SearchError,
    SearchOutcome, SearchResponse, SearchStats, Suggestions, TopQuery,
};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::item::{Item, NewItem, SearchLogEntry};
use crate::metrics;
use crate::search::{
    ItemField, Predicate, PredicateBuilder, SearchQuery, SortField, SortKey, SortOrder, SortSpec,
    SqlTranslator,
};
use crate::storage::sql::SqlStore;
use crate::storage::traits::{ItemStore, SearchLogStore, StorageError};

/// Fields a keyword is matched against in `search`
pub const KEYWORD_FIELDS: [ItemField; 3] = [ItemField::Title, ItemField::Description, ItemField::Tags];

/// Keyword search over an item catalog.
///
/// Holds no mutable state; share it behind an `Arc`.
pub struct SearchEngine {
    config: SearchConfig,
    items: Arc<dyn ItemStore>,
    log: Arc<dyn SearchLogStore>,
}

impl SearchEngine {
    /// Create an engine over separate catalog and log stores.
    pub fn new(
        config: SearchConfig,
        items: Arc<dyn ItemStore>,
        log: Arc<dyn SearchLogStore>,
    ) -> Self {
        Self { config, items, log }
    }

    /// Create an engine over one store that holds both the catalog and the log.
    pub fn with_store<S>(config: SearchConfig, store: Arc<S>) -> Self
    where
        S: ItemStore + SearchLogStore + 'static,
    {
        let items: Arc<dyn ItemStore> = store.clone();
        let log: Arc<dyn SearchLogStore> = store;
        Self::new(config, items, log)
    }

    /// Connect a [`SqlStore`] from `config.sql_url` and build an engine on it.
    pub async fn connect(config: SearchConfig) -> Result<Self, StorageError> {
        let store = Arc::new(SqlStore::from_config(&config).await?);
        info!("Search engine connected");
        Ok(Self::with_store(config, store))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Insert one item into the catalog.
    pub async fn insert_item(&self, item: &NewItem) -> Result<Item, SearchError> {
        Ok(self.items.insert_item(item).await?)
    }

    /// Insert a batch of items into the catalog.
    pub async fn insert_items(&self, items: &[NewItem]) -> Result<usize, SearchError> {
        Ok(self.items.insert_items(items).await?)
    }

    /// Translate the query's keyword and filters into one conjunctive predicate.
    ///
    /// An empty keyword adds no text constraint. With no constraints at all
    /// the predicate matches every item.
    pub fn build_predicate(query: &SearchQuery) -> Predicate {
        let has_price_bound = query.min_price.is_some() || query.max_price.is_some();

        PredicateBuilder::new()
            .push_if(!query.keyword.is_empty(), || {
                Predicate::any_contains(&KEYWORD_FIELDS, &query.keyword)
            })
            .push_if(query.category.is_some(), || {
                Predicate::equals(ItemField::Category, query.category.clone().unwrap_or_default())
            })
            .push_if(has_price_bound, || {
                Predicate::range(ItemField::Price, query.min_price, query.max_price)
            })
            .build_and()
    }

    /// Resolve the sort key and order.
    ///
    /// Relevance is approximated by popularity, always descending.
    pub fn sort_spec(query: &SearchQuery) -> SortSpec {
        match query.sort {
            SortKey::Relevance => SortSpec::new(SortField::Popularity, SortOrder::Desc),
            SortKey::Date => SortSpec::new(SortField::CreatedAt, query.order),
            SortKey::Popularity => SortSpec::new(SortField::Popularity, query.order),
            SortKey::Price => SortSpec::new(SortField::Price, query.order),
        }
    }

    /// Execute a search: count all matches, fetch the requested page, and
    /// record the search in the log.
    ///
    /// The query is not re-validated here. A failing store read is returned
    /// as an error; a failing log append is only logged.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let predicate = Self::build_predicate(query);
        let sort = Self::sort_spec(query);
        let offset = query.offset();

        let fetched = async {
            let total = self.items.count_matching(&predicate).await?;
            let items = if offset >= total {
                Vec::new()
            } else {
                self.items
                    .find_matching(&predicate, &sort, offset, u64::from(query.size))
                    .await?
            };
            Ok::<_, StorageError>((total, items))
        }
        .await;

        let elapsed = start.elapsed();
        let (total, items) = match fetched {
            Ok(found) => found,
            Err(e) => {
                metrics::record_search_query(false);
                warn!(keyword = %query.keyword, error = %e, "Search failed");
                return Err(e.into());
            }
        };

        metrics::record_search_query(true);
        metrics::record_search_latency(elapsed);
        metrics::record_search_results(total);

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        debug!(
            keyword = %query.keyword,
            filter = %SqlTranslator::translate_inline(&predicate),
            total,
            returned = items.len(),
            page = query.page,
            elapsed_ms,
            "Search executed"
        );

        self.record_search(&query.keyword, total, elapsed_ms).await;

        Ok(SearchOutcome {
            items,
            total,
            elapsed_ms,
        })
    }

    /// Append a search log entry. Failures are logged and counted, never returned.
    async fn record_search(&self, keyword: &str, total: u64, elapsed_ms: f64) {
        let entry = SearchLogEntry::new(keyword, total, elapsed_ms);
        match self.log.append(&entry).await {
            Ok(()) => metrics::record_log_write(true),
            Err(e) => {
                metrics::record_log_write(false);
                metrics::record_best_effort_failure("record_search");
                warn!(keyword = %keyword, error = %e, "Failed to record search log entry");
            }
        }
    }

    /// Count a swallowed failure on a best-effort path.
    fn best_effort_failed(operation: &'static str, error: &StorageError) {
        metrics::record_best_effort_failure(operation);
        warn!(operation, error = %error, "Best-effort operation failed");
    }
}
