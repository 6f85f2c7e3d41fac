// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Catalog Search
//!
//! Keyword search over an item catalog with filters, sorting and pagination,
//! plus autocomplete, query suggestions, facets and usage analytics.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SearchEngine                         │
//! │  • search / search_response                                │
//! │  • autocomplete, suggestions, facets, stats                │
//! │  • related suggestions, popular queries, analytics         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (Predicate + SortSpec AST)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ItemStore / SearchLogStore                │
//! │  • SqlStore: SQLite or MySQL via sqlx Any driver           │
//! │  • InMemoryStore: DashMap catalog, RwLock log              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use catalog_search::{NewItem, SearchConfig, SearchEngine, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SearchConfig {
//!         sql_url: Some("sqlite://catalog.db?mode=rwc".into()),
//!         ..Default::default()
//!     };
//!     let engine = SearchEngine::connect(config).await?;
//!
//!     engine.insert_item(&NewItem::new("Wireless mouse").with_price(24.99)).await?;
//!
//!     let query = SearchQuery::new("mouse").sort("price").order("asc");
//!     let response = engine.search_response(&query).await?;
//!     println!("{} matches", response.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Search, autocomplete, suggestions, facets and stats return
//! [`SearchError`] when the store fails. Logging a search, related
//! suggestions, popular queries and per-query analytics are best-effort:
//! failures are logged via `tracing` and counted in metrics, and an empty
//! or zeroed value is returned.
//!
//! ## Modules
//!
//! - [`engine`]: The [`SearchEngine`] and its response types
//! - [`search`]: Query model, predicate AST and SQL translation
//! - [`storage`]: Store traits and the SQL / in-memory backends
//! - [`highlight`]: Keyword highlighting
//! - [`resilience`]: Start-up connection retry

pub mod config;
pub mod item;
pub mod search;
pub mod storage;
pub mod engine;
pub mod highlight;
pub mod resilience;
pub mod metrics;

pub use config::SearchConfig;
pub use item::{Item, NewItem, SearchLogEntry};
pub use search::{Predicate, PredicateBuilder, SearchQuery, SortKey, SortOrder, SortSpec};
pub use engine::{
    Facets, HighlightedItem, PopularQuery, SearchAnalytics, SearchEngine, SearchError,
    SearchOutcome, SearchResponse, SearchStats, Suggestions, TopQuery,
};
pub use storage::traits::{CategoryCount, ItemStore, SearchLogStore, StorageError};
pub use storage::sql::SqlStore;
pub use storage::memory::InMemoryStore;
pub use highlight::highlight_text;
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
