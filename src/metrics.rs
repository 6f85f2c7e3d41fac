// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for catalog search.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding service is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `catalog_search_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: store primitive or best-effort engine call
//! - `status`: success, error

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// Record a search execution
pub fn record_search_query(success: bool) {
    counter!(
        "catalog_search_queries_total",
        "status" => status_label(success)
    )
    .increment(1);
}

/// Record search latency (predicate, count and page fetch)
pub fn record_search_latency(duration: Duration) {
    histogram!("catalog_search_seconds").record(duration.as_secs_f64());
}

/// Record the total hit count of a search
pub fn record_search_results(count: u64) {
    histogram!("catalog_search_results").record(count as f64);
}

/// Record a search log append
pub fn record_log_write(success: bool) {
    counter!(
        "catalog_search_log_writes_total",
        "status" => status_label(success)
    )
    .increment(1);
}

/// Record a swallowed failure on a best-effort path
pub fn record_best_effort_failure(operation: &'static str) {
    counter!(
        "catalog_search_best_effort_failures_total",
        "operation" => operation
    )
    .increment(1);
}

/// Record store primitive latency
pub fn record_store_latency(operation: &'static str, duration: Duration) {
    histogram!(
        "catalog_search_store_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}

/// A timing guard that records store latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_store_latency(self.operation, self.start.elapsed());
    }
}
