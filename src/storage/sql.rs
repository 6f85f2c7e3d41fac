// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL storage backend for the catalog and search log.
//!
//! Works against SQLite or MySQL through sqlx's `Any` driver. Predicates are
//! rendered by [`SqlTranslator`] and bound as `?` parameters.
//!
//! Schema (MySQL flavour):
//! ```sql
//! CREATE TABLE search_items (
//!   id BIGINT AUTO_INCREMENT PRIMARY KEY,
//!   title VARCHAR(255) NOT NULL,
//!   description TEXT,
//!   category VARCHAR(100),
//!   tags VARCHAR(500),          -- comma-joined keywords
//!   price DOUBLE,
//!   popularity BIGINT NOT NULL DEFAULT 0,
//!   created_at BIGINT NOT NULL, -- epoch millis
//!   updated_at BIGINT NOT NULL
//! )
//! CREATE TABLE search_logs (
//!   id BIGINT AUTO_INCREMENT PRIMARY KEY,
//!   query VARCHAR(255) NOT NULL,
//!   result_count BIGINT NOT NULL DEFAULT 0,
//!   response_time_ms DOUBLE,
//!   created_at BIGINT NOT NULL
//! )
//! ```
//!
//! ## sqlx Any Driver Quirks
//!
//! The `Any` driver hands MySQL TEXT columns back as bytes, so text columns
//! are read as `String` first and as `Vec<u8>` second.
//!
//! SQLite's `LIKE` ignores ASCII case by default. Every SQLite connection
//! turns on `case_sensitive_like` so prefix and substring matches agree with
//! the in-memory store.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Row};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::item::{now_millis, Item, NewItem, SearchLogEntry};
use crate::metrics::LatencyTimer;
use crate::resilience::retry::{retry, RetryConfig};
use crate::search::{Predicate, SortSpec, SqlClause, SqlParam, SqlTranslator, LIKE_ESCAPE};
use super::traits::{
    CategoryCount, ItemStore, LogTotals, QueryAggregate, SearchLogStore, StorageError,
};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

const ITEM_COLUMNS: &str =
    "id, title, description, category, tags, price, popularity, created_at, updated_at";

type AnyQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

pub struct SqlStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlStore {
    /// Connect with default pool settings.
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        let defaults = SearchConfig::default();
        Self::connect(
            connection_string,
            defaults.max_connections,
            Duration::from_secs(defaults.acquire_timeout_secs),
        )
        .await
    }

    /// Connect using `sql_url` and the pool settings from `config`.
    pub async fn from_config(config: &SearchConfig) -> Result<Self, StorageError> {
        let url = config
            .sql_url
            .as_deref()
            .ok_or_else(|| StorageError::Connection("sql_url is not configured".into()))?;
        Self::connect(
            url,
            config.max_connections,
            Duration::from_secs(config.acquire_timeout_secs),
        )
        .await
    }

    /// Connect with startup-mode retry (fails fast if config is wrong).
    pub async fn connect(
        connection_string: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            let mut options = AnyPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(acquire_timeout)
                .idle_timeout(Duration::from_secs(300));
            if is_sqlite {
                options = options.after_connect(|conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("PRAGMA case_sensitive_like = ON")
                            .execute(conn)
                            .await?;
                        Ok(())
                    })
                });
            }
            options
                .connect(connection_string)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))
        })
        .await?;

        let store = Self { pool, is_sqlite };

        if is_sqlite {
            store.enable_wal_mode().await?;
        }

        store.init_schema().await?;
        debug!(sqlite = is_sqlite, "SQL store ready");
        Ok(store)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    /// Close the pool; later operations fail with a connection error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Enable WAL mode for SQLite so log appends don't block catalog reads.
    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let statements: &[&str] = if self.is_sqlite {
            &[
                r#"
                CREATE TABLE IF NOT EXISTS search_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    category TEXT,
                    tags TEXT,
                    price REAL,
                    popularity INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_items_title ON search_items (title)",
                "CREATE INDEX IF NOT EXISTS idx_items_category_price ON search_items (category, price)",
                r#"
                CREATE TABLE IF NOT EXISTS search_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    query TEXT NOT NULL,
                    result_count INTEGER NOT NULL DEFAULT 0,
                    response_time_ms REAL,
                    created_at INTEGER NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_logs_query ON search_logs (query)",
                "CREATE INDEX IF NOT EXISTS idx_logs_created_at ON search_logs (created_at)",
            ]
        } else {
            &[
                r#"
                CREATE TABLE IF NOT EXISTS search_items (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    title VARCHAR(255) NOT NULL,
                    description TEXT,
                    category VARCHAR(100),
                    tags VARCHAR(500),
                    price DOUBLE,
                    popularity BIGINT NOT NULL DEFAULT 0,
                    created_at BIGINT NOT NULL,
                    updated_at BIGINT NOT NULL,
                    INDEX idx_title (title),
                    INDEX idx_category_price (category, price),
                    INDEX idx_created_at (created_at),
                    INDEX idx_popularity (popularity)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS search_logs (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    query VARCHAR(255) NOT NULL,
                    result_count BIGINT NOT NULL DEFAULT 0,
                    response_time_ms DOUBLE,
                    created_at BIGINT NOT NULL,
                    INDEX idx_query (query),
                    INDEX idx_created_at (created_at)
                )
                "#,
            ]
        };

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
        }

        Ok(())
    }
}

/// Pool-level failures mean the store is unreachable; the rest are backend errors.
fn map_sqlx(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Connection(e.to_string())
        }
        other => StorageError::Backend(other.to_string()),
    }
}

fn bind_params<'q>(mut query: AnyQuery<'q>, params: &'q [SqlParam]) -> AnyQuery<'q> {
    for param in params {
        query = match param {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Numeric(n) => query.bind(*n),
        };
    }
    query
}

/// Read a text column as String (SQLite TEXT), then as bytes (MySQL TEXT).
fn text_column(row: &AnyRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

fn decode_error(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn count_column(row: &AnyRow, column: &str) -> Result<u64, StorageError> {
    let count: i64 = row.try_get(column).map_err(decode_error)?;
    Ok(count.max(0) as u64)
}

fn row_to_item(row: &AnyRow) -> Result<Item, StorageError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let title = text_column(row, "title")
        .ok_or_else(|| StorageError::Backend(format!("Item {} has no title", id)))?;

    Ok(Item {
        id,
        title,
        description: text_column(row, "description"),
        category: text_column(row, "category"),
        tags: text_column(row, "tags"),
        price: row.try_get::<Option<f64>, _>("price").unwrap_or(None),
        popularity: row.try_get("popularity").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn row_to_aggregate(row: &AnyRow) -> Result<QueryAggregate, StorageError> {
    Ok(QueryAggregate {
        query: text_column(row, "query").unwrap_or_default(),
        count: count_column(row, "cnt")?,
        avg_response_ms: row.try_get::<Option<f64>, _>("avg_ms").unwrap_or(None).unwrap_or(0.0),
        last_searched: row.try_get::<Option<i64>, _>("last_at").unwrap_or(None).unwrap_or(0),
    })
}

#[async_trait]
impl ItemStore for SqlStore {
    async fn count_matching(&self, predicate: &Predicate) -> Result<u64, StorageError> {
        let _timer = LatencyTimer::new("count_matching");
        let SqlClause { clause, params } = SqlTranslator::translate(predicate);
        let sql = format!("SELECT COUNT(*) AS cnt FROM search_items WHERE {}", clause);

        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

        count_column(&row, "cnt")
    }

    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Item>, StorageError> {
        let _timer = LatencyTimer::new("find_matching");
        let SqlClause { clause, params } = SqlTranslator::translate(predicate);
        let sql = format!(
            "SELECT {} FROM search_items WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            ITEM_COLUMNS,
            clause,
            SqlTranslator::order_by(sort)
        );

        let rows = bind_params(sqlx::query(&sql), &params)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn distinct_titles(&self, predicate: &Predicate, limit: usize) -> Result<Vec<String>, StorageError> {
        let _timer = LatencyTimer::new("distinct_titles");
        let SqlClause { clause, params } = SqlTranslator::translate(predicate);
        let sql = format!(
            "SELECT DISTINCT title FROM search_items WHERE {} LIMIT ?",
            clause
        );

        let rows = bind_params(sqlx::query(&sql), &params)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(rows.iter().filter_map(|row| text_column(row, "title")).collect())
    }

    async fn category_counts(&self, predicate: &Predicate) -> Result<Vec<CategoryCount>, StorageError> {
        let _timer = LatencyTimer::new("category_counts");
        let SqlClause { clause, params } = SqlTranslator::translate(predicate);
        let sql = format!(
            "SELECT category, COUNT(*) AS cnt FROM search_items \
             WHERE {} AND category IS NOT NULL AND category <> '' \
             GROUP BY category ORDER BY cnt DESC, category ASC",
            clause
        );

        let rows = bind_params(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut facets = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(category) = text_column(row, "category") {
                facets.push(CategoryCount {
                    category,
                    count: count_column(row, "cnt")?,
                });
            }
        }
        Ok(facets)
    }

    async fn count_all(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM search_items")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

        count_column(&row, "cnt")
    }

    /// Insert one item and read its row id back on the same transaction.
    ///
    /// The `Any` driver does not report a last-insert id for SQLite, so the
    /// id is selected explicitly before commit.
    async fn insert_item(&self, item: &NewItem) -> Result<Item, StorageError> {
        item.validate().map_err(StorageError::InvalidItem)?;
        let now = now_millis();
        let created_at = item.created_at.unwrap_or(now);
        let id_sql = if self.is_sqlite {
            "SELECT last_insert_rowid() AS id"
        } else {
            "SELECT CAST(LAST_INSERT_ID() AS SIGNED) AS id"
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let inserted = async {
            sqlx::query(
                "INSERT INTO search_items (title, description, category, tags, price, popularity, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.title.as_str())
            .bind(item.description.clone())
            .bind(item.normalized_category())
            .bind(item.tags.clone())
            .bind(item.price)
            .bind(item.popularity)
            .bind(created_at)
            .bind(created_at.max(now))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

            let row = sqlx::query(id_sql)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx)?;
            row.try_get::<i64, _>("id")
                .map_err(|e| StorageError::Backend(e.to_string()))
        }
        .await;

        match inserted {
            Ok(id) => {
                tx.commit().await.map_err(map_sqlx)?;
                Ok(item.clone().into_item(id, now))
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Item insert rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Insert a batch with multi-row INSERTs inside one transaction.
    async fn insert_items(&self, items: &[NewItem]) -> Result<usize, StorageError> {
        if items.is_empty() {
            return Ok(0);
        }
        for item in items {
            item.validate().map_err(StorageError::InvalidItem)?;
        }

        // Keep statements well under MySQL's max_allowed_packet
        const CHUNK_SIZE: usize = 500;
        let now = now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut written = 0usize;

        for chunk in items.chunks(CHUNK_SIZE) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "(?, ?, ?, ?, ?, ?, ?, ?)").collect();
            let sql = format!(
                "INSERT INTO search_items (title, description, category, tags, price, popularity, created_at, updated_at) VALUES {}",
                placeholders.join(", ")
            );

            let mut query = sqlx::query(&sql);
            for item in chunk {
                let created_at = item.created_at.unwrap_or(now);
                query = query
                    .bind(item.title.as_str())
                    .bind(item.description.clone())
                    .bind(item.normalized_category())
                    .bind(item.tags.clone())
                    .bind(item.price)
                    .bind(item.popularity)
                    .bind(created_at)
                    .bind(created_at.max(now));
            }

            let result = query.execute(&mut *tx).await.map_err(map_sqlx)?;
            written += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(map_sqlx)?;
        debug!(written, "Inserted item batch");
        Ok(written)
    }
}

#[async_trait]
impl SearchLogStore for SqlStore {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let inserted = sqlx::query(
            "INSERT INTO search_logs (query, result_count, response_time_ms, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.query.as_str())
        .bind(entry.result_count as i64)
        .bind(entry.response_time_ms)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => tx.commit().await.map_err(map_sqlx),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Search log rollback failed");
                }
                Err(map_sqlx(e))
            }
        }
    }

    async fn top_queries(&self, limit: usize) -> Result<Vec<QueryAggregate>, StorageError> {
        let rows = sqlx::query(
            "SELECT query, COUNT(*) AS cnt, AVG(response_time_ms) AS avg_ms, MAX(created_at) AS last_at \
             FROM search_logs GROUP BY query ORDER BY cnt DESC, query ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.iter().map(row_to_aggregate).collect()
    }

    async fn recent_queries(&self, limit: usize) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            "SELECT query, MAX(created_at) AS last_at \
             FROM search_logs GROUP BY query ORDER BY last_at DESC, query ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.iter().filter_map(|row| text_column(row, "query")).collect())
    }

    async fn queries_containing(
        &self,
        fragment: &str,
        exclude: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        let pattern = format!("%{}%", SqlTranslator::escape_like(fragment));
        let sql = format!(
            "SELECT query, COUNT(*) AS cnt FROM search_logs \
             WHERE query LIKE ? ESCAPE '{}' AND query <> ? \
             GROUP BY query ORDER BY cnt DESC, query ASC LIMIT ?",
            LIKE_ESCAPE
        );

        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(exclude)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(rows.iter().filter_map(|row| text_column(row, "query")).collect())
    }

    async fn query_aggregate(&self, query: &str) -> Result<Option<QueryAggregate>, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt, AVG(response_time_ms) AS avg_ms, MAX(created_at) AS last_at \
             FROM search_logs WHERE query = ?",
        )
        .bind(query)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let count = count_column(&row, "cnt")?;
        if count == 0 {
            return Ok(None);
        }

        Ok(Some(QueryAggregate {
            query: query.to_string(),
            count,
            avg_response_ms: row.try_get::<Option<f64>, _>("avg_ms").unwrap_or(None).unwrap_or(0.0),
            last_searched: row.try_get::<Option<i64>, _>("last_at").unwrap_or(None).unwrap_or(0),
        }))
    }

    async fn totals(&self) -> Result<LogTotals, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt, AVG(response_time_ms) AS avg_ms FROM search_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(LogTotals {
            searches: count_column(&row, "cnt")?,
            avg_response_ms: row.try_get::<Option<f64>, _>("avg_ms").unwrap_or(None).unwrap_or(0.0),
        })
    }
}
