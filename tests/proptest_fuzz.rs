// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property-based tests for highlighting, query translation and the engine's
//! paging and suggestion limits.
//!
//! Engine properties run against `InMemoryStore` on a throwaway Tokio runtime.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::sync::Arc;

use proptest::prelude::*;

use catalog_search::highlight::highlight_text;
use catalog_search::search::SqlTranslator;
use catalog_search::{
    InMemoryStore, ItemStore, NewItem, SearchConfig, SearchEngine, SearchLogEntry, SearchQuery,
    SortOrder,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// ASCII text including every regex metacharacter (but no '<', so markers
/// can be stripped unambiguously)
fn meta_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .*+?()\\[\\]{}|^$\\\\]{0,40}"
}

fn title_strategy() -> impl Strategy<Value = String> {
    "[A-Ca-c]{1,6}"
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn engine_with_titles(titles: &[String]) -> (Arc<InMemoryStore>, SearchEngine) {
    let store = Arc::new(InMemoryStore::new());
    let items: Vec<NewItem> = titles.iter().map(|t| NewItem::new(t.clone())).collect();
    store.insert_items(&items).await.unwrap();
    let engine = SearchEngine::with_store(SearchConfig::default(), store.clone());
    (store, engine)
}

fn strip_marks(s: &str) -> String {
    s.replace("<mark>", "").replace("</mark>", "")
}

// =============================================================================
// Highlighting
// =============================================================================

proptest! {
    /// Highlighting only ever inserts markers
    #[test]
    fn prop_highlight_preserves_text(text in meta_text_strategy(), query in meta_text_strategy()) {
        let highlighted = highlight_text(&text, &query);
        prop_assert_eq!(strip_marks(&highlighted), text);
    }

    /// A literal (case-insensitive) occurrence is always marked
    #[test]
    fn prop_highlight_marks_literal_occurrence(
        prefix in meta_text_strategy(),
        query in "[a-zA-Z0-9.*+?()|^$]{1,10}",
        suffix in meta_text_strategy(),
    ) {
        let text = format!("{}{}{}", prefix, query.to_ascii_uppercase(), suffix);
        let highlighted = highlight_text(&text, &query);
        prop_assert!(highlighted.contains("<mark>"));
    }

    /// Metacharacters never match anything but themselves
    #[test]
    fn prop_highlight_no_false_matches(text in "[a-z ]{0,40}", query in "[.*+?()|^$]{1,5}") {
        prop_assert_eq!(highlight_text(&text, &query), text);
    }

    #[test]
    fn prop_highlight_empty_query_is_identity(text in ".*") {
        prop_assert_eq!(highlight_text(&text, ""), text);
    }
}

// =============================================================================
// Query parsing and translation
// =============================================================================

proptest! {
    /// Only the literal "asc" sorts ascending
    #[test]
    fn prop_order_parsing_is_lax(order in ".{0,10}") {
        let parsed = SortOrder::from(order.as_str());
        if order == "asc" {
            prop_assert_eq!(parsed, SortOrder::Asc);
        } else {
            prop_assert_eq!(parsed, SortOrder::Desc);
        }
    }

    /// Every placeholder gets exactly one bound parameter
    #[test]
    fn prop_placeholders_match_params(
        keyword in ".{0,20}",
        category in proptest::option::of("[a-z]{1,8}"),
        min in proptest::option::of(0.0f64..500.0),
        max in proptest::option::of(0.0f64..500.0),
    ) {
        let mut query = SearchQuery::new(keyword).price_range(min, max);
        if let Some(category) = category {
            query = query.category(category);
        }
        let sql = SqlTranslator::translate(&SearchEngine::build_predicate(&query));
        prop_assert_eq!(sql.clause.matches('?').count(), sql.params.len());
    }

    /// LIKE escaping leaves no unescaped wildcard
    #[test]
    fn prop_escape_like_neutralizes_wildcards(text in "[a-z%_!]{0,20}") {
        let escaped = SqlTranslator::escape_like(&text);
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '!' {
                let next = chars.next();
                prop_assert!(matches!(next, Some('%') | Some('_') | Some('!')));
            } else {
                prop_assert!(c != '%' && c != '_');
            }
        }
    }
}

// =============================================================================
// Engine invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Page length is min(size, total - offset), total never depends on paging
    #[test]
    fn prop_page_length(n in 0usize..40, page in 1u32..10, size in 1u32..15) {
        let rt = runtime();
        let titles: Vec<String> = (0..n).map(|i| format!("item {}", i)).collect();
        let (_store, engine) = rt.block_on(engine_with_titles(&titles));

        let outcome = rt
            .block_on(engine.search(&SearchQuery::new("item").page(page).size(size)))
            .unwrap();

        let total = n as u64;
        let skipped = u64::from(page - 1) * u64::from(size);
        prop_assert_eq!(outcome.total, total);
        prop_assert_eq!(outcome.items.len() as u64, total.saturating_sub(skipped).min(u64::from(size)));
    }

    /// Ascending price sort is non-decreasing (NULLs first)
    #[test]
    fn prop_price_sort_monotonic(prices in prop::collection::vec(proptest::option::of(0u32..1000), 0..30)) {
        let rt = runtime();
        let store = Arc::new(InMemoryStore::new());
        let items: Vec<NewItem> = prices
            .iter()
            .map(|p| {
                let item = NewItem::new("thing");
                match p {
                    Some(p) => item.with_price(f64::from(*p)),
                    None => item,
                }
            })
            .collect();
        rt.block_on(store.insert_items(&items)).unwrap();
        let engine = SearchEngine::with_store(SearchConfig::default(), store);

        let outcome = rt
            .block_on(engine.search(&SearchQuery::new("thing").sort("price").order("asc").size(100)))
            .unwrap();
        let keys: Vec<Option<f64>> = outcome.items.iter().map(|i| i.price).collect();
        let non_decreasing = keys.windows(2).all(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => a <= b,
            (Some(_), None) => false,
            _ => true,
        });
        prop_assert!(non_decreasing, "prices out of order: {:?}", keys);
    }

    /// Autocomplete is bounded, distinct and prefix-true
    #[test]
    fn prop_autocomplete_limit(
        titles in prop::collection::vec(title_strategy(), 0..40),
        prefix in "[A-Ca-c]{0,2}",
        limit in 0usize..30,
    ) {
        let rt = runtime();
        let (_store, engine) = rt.block_on(engine_with_titles(&titles));

        let found = rt.block_on(engine.autocomplete(&prefix, limit)).unwrap();
        prop_assert!(found.len() <= limit.min(20));
        prop_assert!(found.iter().all(|t| t.starts_with(&prefix)));
        let mut deduped = found.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), found.len());
    }

    /// Related suggestions are bounded, distinct and never echo the query
    #[test]
    fn prop_related_suggestions_limit(
        history in prop::collection::vec("[a-c ]{1,8}", 0..30),
        query in "[a-c ]{0,8}",
        limit in 0usize..12,
    ) {
        let rt = runtime();
        let store = Arc::new(InMemoryStore::new());
        for (i, q) in history.iter().enumerate() {
            store.push_log_entry(SearchLogEntry {
                query: q.clone(),
                result_count: 0,
                response_time_ms: 1.0,
                created_at: i as i64,
            });
        }
        let engine = SearchEngine::with_store(SearchConfig::default(), store);

        let related = rt.block_on(engine.related_suggestions(&query, limit));
        prop_assert!(related.len() <= limit);
        prop_assert!(!related.contains(&query));
        let mut deduped = related.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), related.len());
    }

    /// Popular queries are ordered by count, ties by text
    #[test]
    fn prop_popular_queries_sorted(history in prop::collection::vec("[a-d]{1,2}", 0..40)) {
        let rt = runtime();
        let store = Arc::new(InMemoryStore::new());
        for (i, q) in history.iter().enumerate() {
            store.push_log_entry(SearchLogEntry {
                query: q.clone(),
                result_count: 0,
                response_time_ms: 1.0,
                created_at: i as i64,
            });
        }
        let engine = SearchEngine::with_store(SearchConfig::default(), store);

        let popular = rt.block_on(engine.popular_queries(50));
        let ordered = popular.windows(2).all(|w| {
            w[0].count > w[1].count || (w[0].count == w[1].count && w[0].query < w[1].query)
        });
        prop_assert!(ordered, "popular queries out of order: {:?}", popular);
        let counted: u64 = popular.iter().map(|p| p.count).sum();
        prop_assert_eq!(counted, history.len() as u64);
    }
}
