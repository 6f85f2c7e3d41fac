// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory catalog and search log.
//!
//! Evaluates [`Predicate`]s directly against stored items and mirrors the SQL
//! store's ordering rules, so engine behaviour can be exercised without a
//! database. Failure switches simulate an unreachable store or a log table
//! that rejects writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::item::{now_millis, Item, NewItem, SearchLogEntry};
use crate::search::{Predicate, SortSpec};
use super::traits::{
    CategoryCount, ItemStore, LogTotals, QueryAggregate, SearchLogStore, StorageError,
};

pub struct InMemoryStore {
    items: DashMap<i64, Item>,
    next_id: AtomicI64,
    log: RwLock<Vec<SearchLogEntry>>,
    unavailable: AtomicBool,
    fail_log_writes: AtomicBool,
    fail_log_reads: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicI64::new(1),
            log: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            fail_log_writes: AtomicBool::new(false),
            fail_log_reads: AtomicBool::new(false),
        }
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of search log entries
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.read().len()
    }

    /// Snapshot of the search log, oldest first
    pub fn log_entries(&self) -> Vec<SearchLogEntry> {
        self.log.read().clone()
    }

    /// Make every operation fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make search log appends fail.
    pub fn set_fail_log_writes(&self, fail: bool) {
        self.fail_log_writes.store(fail, Ordering::SeqCst);
    }

    /// Make search log aggregations fail.
    pub fn set_fail_log_reads(&self, fail: bool) {
        self.fail_log_reads.store(fail, Ordering::SeqCst);
    }

    /// Append a log entry with an explicit timestamp.
    pub fn push_log_entry(&self, entry: SearchLogEntry) {
        self.log.write().push(entry);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("in-memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn check_log_reads(&self) -> Result<(), StorageError> {
        self.check_available()?;
        if self.fail_log_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("search log reads disabled".into()));
        }
        Ok(())
    }

    /// Matching items in id order (the store's natural iteration order).
    fn matching(&self, predicate: &Predicate) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .iter()
            .filter(|entry| predicate.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    fn aggregates(&self) -> Vec<QueryAggregate> {
        let log = self.log.read();
        let mut groups: HashMap<&str, (u64, f64, i64)> = HashMap::new();
        for entry in log.iter() {
            let group = groups.entry(entry.query.as_str()).or_insert((0, 0.0, i64::MIN));
            group.0 += 1;
            group.1 += entry.response_time_ms;
            group.2 = group.2.max(entry.created_at);
        }
        groups
            .into_iter()
            .map(|(query, (count, total_ms, last))| QueryAggregate {
                query: query.to_string(),
                count,
                avg_response_ms: total_ms / count as f64,
                last_searched: last,
            })
            .collect()
    }

    fn by_frequency(mut aggregates: Vec<QueryAggregate>) -> Vec<QueryAggregate> {
        aggregates.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        aggregates
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn count_matching(&self, predicate: &Predicate) -> Result<u64, StorageError> {
        self.check_available()?;
        Ok(self
            .items
            .iter()
            .filter(|entry| predicate.matches(entry.value()))
            .count() as u64)
    }

    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Item>, StorageError> {
        self.check_available()?;
        let mut items = self.matching(predicate);
        items.sort_by(|a, b| sort.compare(a, b));
        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn distinct_titles(&self, predicate: &Predicate, limit: usize) -> Result<Vec<String>, StorageError> {
        self.check_available()?;
        let mut titles: Vec<String> = Vec::new();
        for item in self.matching(predicate) {
            if titles.len() >= limit {
                break;
            }
            if !titles.contains(&item.title) {
                titles.push(item.title);
            }
        }
        Ok(titles)
    }

    async fn category_counts(&self, predicate: &Predicate) -> Result<Vec<CategoryCount>, StorageError> {
        self.check_available()?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for item in self.matching(predicate) {
            match item.category {
                Some(category) if !category.is_empty() => *counts.entry(category).or_insert(0) += 1,
                _ => {}
            }
        }
        let mut facets: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        Ok(facets)
    }

    async fn count_all(&self) -> Result<u64, StorageError> {
        self.check_available()?;
        Ok(self.items.len() as u64)
    }

    async fn insert_item(&self, item: &NewItem) -> Result<Item, StorageError> {
        self.check_available()?;
        item.validate().map_err(StorageError::InvalidItem)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = item.clone().into_item(id, now_millis());
        self.items.insert(id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl SearchLogStore for InMemoryStore {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), StorageError> {
        self.check_available()?;
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("search log writes disabled".into()));
        }
        self.log.write().push(entry.clone());
        Ok(())
    }

    async fn top_queries(&self, limit: usize) -> Result<Vec<QueryAggregate>, StorageError> {
        self.check_log_reads()?;
        let mut top = Self::by_frequency(self.aggregates());
        top.truncate(limit);
        Ok(top)
    }

    async fn recent_queries(&self, limit: usize) -> Result<Vec<String>, StorageError> {
        self.check_log_reads()?;
        let mut aggregates = self.aggregates();
        aggregates.sort_by(|a, b| {
            b.last_searched
                .cmp(&a.last_searched)
                .then_with(|| a.query.cmp(&b.query))
        });
        Ok(aggregates.into_iter().take(limit).map(|a| a.query).collect())
    }

    async fn queries_containing(
        &self,
        fragment: &str,
        exclude: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        self.check_log_reads()?;
        let candidates = self
            .aggregates()
            .into_iter()
            .filter(|a| a.query != exclude && a.query.contains(fragment))
            .collect();
        Ok(Self::by_frequency(candidates)
            .into_iter()
            .take(limit)
            .map(|a| a.query)
            .collect())
    }

    async fn query_aggregate(&self, query: &str) -> Result<Option<QueryAggregate>, StorageError> {
        self.check_log_reads()?;
        Ok(self.aggregates().into_iter().find(|a| a.query == query))
    }

    async fn totals(&self) -> Result<LogTotals, StorageError> {
        self.check_log_reads()?;
        let log = self.log.read();
        if log.is_empty() {
            return Ok(LogTotals::default());
        }
        let total_ms: f64 = log.iter().map(|e| e.response_time_ms).sum();
        Ok(LogTotals {
            searches: log.len() as u64,
            avg_response_ms: total_ms / log.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ItemField, SortField, SortOrder};

    fn log_at(query: &str, ms: f64, at: i64) -> SearchLogEntry {
        SearchLogEntry {
            query: query.to_string(),
            result_count: 1,
            response_time_ms: ms,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.log_len(), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = InMemoryStore::new();
        let a = store.insert_item(&NewItem::new("a")).await.unwrap();
        let b = store.insert_item(&NewItem::new("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_item() {
        let store = InMemoryStore::new();
        let err = store.insert_item(&NewItem::new("")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidItem(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_insert_items_via_trait_default() {
        let store = InMemoryStore::new();
        let items: Vec<NewItem> = (0..5).map(|i| NewItem::new(format!("item {}", i))).collect();
        assert_eq!(store.insert_items(&items).await.unwrap(), 5);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_find_matching_sorts_and_pages() {
        let store = InMemoryStore::new();
        for (title, pop) in [("a", 3), ("b", 1), ("c", 2)] {
            store.insert_item(&NewItem::new(title).with_popularity(pop)).await.unwrap();
        }
        let sort = SortSpec::new(SortField::Popularity, SortOrder::Asc);
        let page = store.find_matching(&Predicate::All, &sort, 1, 5).await.unwrap();
        let titles: Vec<_> = page.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_distinct_titles_dedupes_and_limits() {
        let store = InMemoryStore::new();
        for title in ["Lamp", "Lamp", "Lantern", "Lathe", "lamp"] {
            store.insert_item(&NewItem::new(title)).await.unwrap();
        }
        let prefix = Predicate::prefix(ItemField::Title, "La");
        let titles = store.distinct_titles(&prefix, 10).await.unwrap();
        assert_eq!(titles, vec!["Lamp", "Lantern", "Lathe"]);

        let limited = store.distinct_titles(&prefix, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_category_counts_skip_uncategorized() {
        let store = InMemoryStore::new();
        store.insert_item(&NewItem::new("a").with_category("books")).await.unwrap();
        store.insert_item(&NewItem::new("b").with_category("toys")).await.unwrap();
        store.insert_item(&NewItem::new("c").with_category("toys")).await.unwrap();
        store.insert_item(&NewItem::new("d").with_category("")).await.unwrap();
        store.insert_item(&NewItem::new("e")).await.unwrap();

        let facets = store.category_counts(&Predicate::All).await.unwrap();
        assert_eq!(
            facets,
            vec![
                CategoryCount { category: "toys".into(), count: 2 },
                CategoryCount { category: "books".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_log_aggregations() {
        let store = InMemoryStore::new();
        store.push_log_entry(log_at("phone", 10.0, 100));
        store.push_log_entry(log_at("phone", 20.0, 300));
        store.push_log_entry(log_at("laptop", 5.0, 400));
        store.push_log_entry(log_at("phone case", 1.0, 200));

        let top = store.top_queries(10).await.unwrap();
        assert_eq!(top[0].query, "phone");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].avg_response_ms, 15.0);
        assert_eq!(top[0].last_searched, 300);
        // Ties broken by query text
        assert_eq!(top[1].query, "laptop");
        assert_eq!(top[2].query, "phone case");

        let recent = store.recent_queries(2).await.unwrap();
        assert_eq!(recent, vec!["laptop", "phone"]);

        let related = store.queries_containing("pho", "phone", 5).await.unwrap();
        assert_eq!(related, vec!["phone case"]);

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.searches, 4);
        assert_eq!(totals.avg_response_ms, 9.0);

        assert!(store.query_aggregate("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = InMemoryStore::new();
        store.set_fail_log_writes(true);
        assert!(store.append(&SearchLogEntry::new("q", 0, 1.0)).await.is_err());
        assert_eq!(store.log_len(), 0);

        store.set_fail_log_reads(true);
        assert!(store.top_queries(5).await.is_err());
        assert!(store.count_all().await.is_ok());

        store.set_unavailable(true);
        assert!(matches!(
            store.count_all().await,
            Err(StorageError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for batch in 0..10 {
            let store_clone = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    let item = NewItem::new(format!("batch-{}-item-{}", batch, i));
                    store_clone.insert_item(&item).await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 100);
    }
}
