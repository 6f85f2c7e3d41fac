// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Autocomplete, suggestion and analytics read paths.
//!
//! Primary paths (`autocomplete`, `suggestions`, `facets`, `stats`) propagate
//! store errors. Best-effort paths (`related_suggestions`, `popular_queries`,
//! `search_analytics`) degrade to empty or zeroed values.

use tracing::debug;

use crate::item::now_millis;
use crate::search::{ItemField, Predicate};

use super::types::{
    round2, Facets, PopularQuery, SearchAnalytics, SearchError, SearchStats, Suggestions, TopQuery,
};
use super::SearchEngine;

/// Leading characters of a query used to find related queries
const RELATED_FRAGMENT_CHARS: usize = 3;

impl SearchEngine {
    /// Distinct titles starting with `prefix`, at most `limit` of them.
    ///
    /// `limit` is capped at `config.max_autocomplete_limit`.
    pub async fn autocomplete(&self, prefix: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        let limit = limit.min(self.config.max_autocomplete_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let predicate = Predicate::prefix(ItemField::Title, prefix);
        let titles = self.items.distinct_titles(&predicate, limit).await?;
        debug!(prefix = %prefix, count = titles.len(), "Autocomplete");
        Ok(titles)
    }

    /// The most frequent and the most recent distinct queries.
    pub async fn suggestions(&self) -> Result<Suggestions, SearchError> {
        let n = self.config.suggestions_limit;

        let popular = self
            .log
            .top_queries(n)
            .await?
            .into_iter()
            .map(|aggregate| aggregate.query)
            .collect();
        let recent = self.log.recent_queries(n).await?;

        Ok(Suggestions { popular, recent })
    }

    /// Category counts for items whose title or description contains `keyword`.
    pub async fn facets(&self, keyword: &str) -> Result<Facets, SearchError> {
        let predicate = Predicate::any_contains(&[ItemField::Title, ItemField::Description], keyword);
        let categories = self.items.category_counts(&predicate).await?;
        Ok(Facets { categories })
    }

    /// Prior queries sharing the first three characters of `query`, padded
    /// with the configured fallback suggestions. Never contains `query`.
    pub async fn related_suggestions(&self, query: &str, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        let fragment: String = query.chars().take(RELATED_FRAGMENT_CHARS).collect();
        let mut related = match self.log.queries_containing(&fragment, query, limit).await {
            Ok(found) => found,
            Err(e) => {
                Self::best_effort_failed("related_suggestions", &e);
                return Vec::new();
            }
        };

        for fallback in &self.config.related_fallback {
            if related.len() >= limit {
                break;
            }
            if fallback != query && !related.contains(fallback) {
                related.push(fallback.clone());
            }
        }

        related.truncate(limit);
        related
    }

    /// Most searched queries, count descending then text ascending.
    pub async fn popular_queries(&self, limit: usize) -> Vec<PopularQuery> {
        match self.log.top_queries(limit).await {
            Ok(aggregates) => aggregates
                .into_iter()
                .map(|a| PopularQuery {
                    query: a.query,
                    count: a.count,
                    last_searched: a.last_searched,
                })
                .collect(),
            Err(e) => {
                Self::best_effort_failed("popular_queries", &e);
                Vec::new()
            }
        }
    }

    /// History for one exact query plus its current title match count.
    pub async fn search_analytics(&self, query: &str) -> SearchAnalytics {
        let now = now_millis();

        let aggregate = match self.log.query_aggregate(query).await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                Self::best_effort_failed("search_analytics", &e);
                return SearchAnalytics::empty(query, now);
            }
        };

        let result_count = match self
            .items
            .count_matching(&Predicate::contains(ItemField::Title, query))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                Self::best_effort_failed("search_analytics", &e);
                return SearchAnalytics::empty(query, now);
            }
        };

        match aggregate {
            Some(aggregate) => SearchAnalytics {
                query: query.to_string(),
                search_count: aggregate.count,
                result_count,
                response_time_ms: round2(aggregate.avg_response_ms),
                timestamp: aggregate.last_searched,
                user_agent: None,
                ip_address: None,
            },
            None => SearchAnalytics {
                result_count,
                ..SearchAnalytics::empty(query, now)
            },
        }
    }

    /// Catalog size, search volume and the top queries.
    pub async fn stats(&self) -> Result<SearchStats, SearchError> {
        let total_items = self.items.count_all().await?;
        let totals = self.log.totals().await?;
        let top = self.log.top_queries(self.config.top_queries_limit).await?;

        Ok(SearchStats {
            total_items,
            total_searches: totals.searches,
            avg_response_time_ms: round2(totals.avg_response_ms),
            popular_queries: top
                .into_iter()
                .map(|a| TopQuery {
                    query: a.query,
                    count: a.count,
                    avg_time_ms: round2(a.avg_response_ms),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::SearchConfig;
    use crate::engine::SearchEngine;
    use crate::item::{NewItem, SearchLogEntry};
    use crate::storage::memory::InMemoryStore;
    use crate::storage::traits::{CategoryCount, ItemStore, StorageError};
    use crate::engine::SearchError;

    fn log_at(query: &str, ms: f64, at: i64) -> SearchLogEntry {
        SearchLogEntry {
            query: query.to_string(),
            result_count: 1,
            response_time_ms: ms,
            created_at: at,
        }
    }

    async fn engine() -> (Arc<InMemoryStore>, SearchEngine) {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_items(&[
                NewItem::new("Laptop Pro").with_category("electronics"),
                NewItem::new("Laptop Air").with_category("electronics"),
                NewItem::new("Laptop Pro").with_category("refurbished"),
                NewItem::new("Lamp").with_description("Laptop-friendly desk light").with_category("home"),
                NewItem::new("laptop bag"),
            ])
            .await
            .unwrap();
        store.push_log_entry(log_at("phone", 10.0, 100));
        store.push_log_entry(log_at("phone", 20.0, 300));
        store.push_log_entry(log_at("phone case", 3.0, 200));
        store.push_log_entry(log_at("laptop", 4.0, 400));
        store.push_log_entry(log_at("iphone", 1.0, 50));
        let engine = SearchEngine::with_store(SearchConfig::default(), store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn test_autocomplete_prefix_distinct() {
        let (_store, engine) = engine().await;
        let titles = engine.autocomplete("Lap", 10).await.unwrap();
        assert_eq!(titles, vec!["Laptop Pro", "Laptop Air"]);

        let limited = engine.autocomplete("La", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited.iter().all(|t| t.starts_with("La")));

        assert!(engine.autocomplete("Lap", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autocomplete_limit_is_capped() {
        let store = Arc::new(InMemoryStore::new());
        let items: Vec<NewItem> = (0..40).map(|i| NewItem::new(format!("Item {}", i))).collect();
        store.insert_items(&items).await.unwrap();
        let engine = SearchEngine::with_store(SearchConfig::default(), store);

        let titles = engine.autocomplete("Item", 100).await.unwrap();
        assert_eq!(titles.len(), 20);
    }

    #[tokio::test]
    async fn test_suggestions_popular_and_recent() {
        let (_store, engine) = engine().await;
        let suggestions = engine.suggestions().await.unwrap();

        assert_eq!(suggestions.popular[0], "phone");
        assert_eq!(suggestions.popular.len(), 4);
        assert_eq!(suggestions.recent, vec!["laptop", "phone", "phone case", "iphone"]);
    }

    #[tokio::test]
    async fn test_suggestions_propagate_errors() {
        let (store, engine) = engine().await;
        store.set_fail_log_reads(true);
        assert!(matches!(
            engine.suggestions().await,
            Err(SearchError::Storage(StorageError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn test_facets_title_or_description() {
        let (_store, engine) = engine().await;
        let facets = engine.facets("Laptop").await.unwrap();

        // "laptop bag" has no category and a lowercase title
        assert_eq!(
            facets.categories,
            vec![
                CategoryCount { category: "electronics".into(), count: 2 },
                CategoryCount { category: "home".into(), count: 1 },
                CategoryCount { category: "refurbished".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_related_suggestions_from_history() {
        let (_store, engine) = engine().await;
        let related = engine.related_suggestions("phone", 2).await;
        // "pho" appears in "phone case" and "iphone"; "phone" itself excluded
        assert_eq!(related, vec!["iphone", "phone case"]);
    }

    #[tokio::test]
    async fn test_related_suggestions_padded_with_fallback() {
        let (_store, engine) = engine().await;
        let related = engine.related_suggestions("phone", 5).await;
        assert_eq!(related, vec!["iphone", "phone case", "best sellers", "new arrivals", "on sale"]);
        assert!(!related.contains(&"phone".to_string()));
    }

    #[tokio::test]
    async fn test_related_suggestions_skip_query_in_fallback() {
        let (_store, engine) = engine().await;
        let related = engine.related_suggestions("on sale", 5).await;
        assert!(!related.contains(&"on sale".to_string()));
        assert_eq!(related.len(), 4);
    }

    #[tokio::test]
    async fn test_related_suggestions_multibyte_fragment() {
        let (store, engine) = engine().await;
        store.push_log_entry(log_at("über cool", 1.0, 500));
        let related = engine.related_suggestions("übermensch", 1).await;
        assert_eq!(related, vec!["über cool"]);
    }

    #[tokio::test]
    async fn test_related_suggestions_swallow_errors() {
        let (store, engine) = engine().await;
        store.set_fail_log_reads(true);
        assert!(engine.related_suggestions("phone", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_popular_queries() {
        let (store, engine) = engine().await;
        let popular = engine.popular_queries(3).await;

        assert_eq!(popular.len(), 3);
        assert_eq!(popular[0].query, "phone");
        assert_eq!(popular[0].count, 2);
        assert_eq!(popular[0].last_searched, 300);
        // Ties broken by query text
        assert_eq!(popular[1].query, "iphone");
        assert_eq!(popular[2].query, "laptop");

        store.set_fail_log_reads(true);
        assert!(engine.popular_queries(3).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_analytics() {
        let (_store, engine) = engine().await;
        let analytics = engine.search_analytics("phone").await;

        assert_eq!(analytics.search_count, 2);
        assert_eq!(analytics.response_time_ms, 15.0);
        assert_eq!(analytics.timestamp, 300);
        assert_eq!(analytics.result_count, 0);
        assert!(analytics.user_agent.is_none());
        assert!(analytics.ip_address.is_none());

        let laptop = engine.search_analytics("Laptop").await;
        assert_eq!(laptop.search_count, 0);
        assert_eq!(laptop.result_count, 3);
        assert!(laptop.timestamp > 0);
    }

    #[tokio::test]
    async fn test_search_analytics_defaults_on_failure() {
        let (store, engine) = engine().await;
        store.set_unavailable(true);
        let analytics = engine.search_analytics("phone").await;
        assert_eq!(analytics.search_count, 0);
        assert_eq!(analytics.result_count, 0);
        assert_eq!(analytics.response_time_ms, 0.0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_store, engine) = engine().await;
        let stats = engine.stats().await.unwrap();

        assert_eq!(stats.total_items, 5);
        assert_eq!(stats.total_searches, 5);
        assert_eq!(stats.avg_response_time_ms, 7.6);
        assert_eq!(stats.popular_queries[0].query, "phone");
        assert_eq!(stats.popular_queries[0].avg_time_ms, 15.0);
        assert_eq!(stats.popular_queries.len(), 4);
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let store = Arc::new(InMemoryStore::new());
        let engine = SearchEngine::with_store(SearchConfig::default(), store);
        let stats = engine.stats().await.unwrap();

        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.total_searches, 0);
        assert_eq!(stats.avg_response_time_ms, 0.0);
        assert!(stats.popular_queries.is_empty());
    }
}
