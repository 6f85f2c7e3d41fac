// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic catalog-search usage example.
//!
//! Demonstrates:
//! 1. Connecting to a throwaway SQLite catalog
//! 2. Ingesting a handful of items
//! 3. Searching with filters, sorting and pagination
//! 4. Autocomplete, suggestions, facets and stats
//! 5. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use catalog_search::{NewItem, SearchConfig, SearchEngine, SearchQuery};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures everything for the dump at the end)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .map_err(|_| "failed to install metrics recorder")?;

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           catalog-search: Basic Usage Example                 ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and connect
    // ─────────────────────────────────────────────────────────────────────────
    let dir = tempfile::tempdir()?;
    let config = SearchConfig {
        sql_url: Some(format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display())),
        ..Default::default()
    };
    let engine = SearchEngine::connect(config).await?;
    println!("📦 Connected to SQLite catalog in {}", dir.path().display());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Ingest
    // ─────────────────────────────────────────────────────────────────────────
    let items = vec![
        NewItem::new("Wireless mouse").with_category("electronics").with_price(24.99).with_popularity(80),
        NewItem::new("Wireless keyboard").with_category("electronics").with_price(49.0).with_popularity(65),
        NewItem::new("Mouse pad").with_category("accessories").with_price(9.5).with_popularity(30),
        NewItem::new("Ergonomic chair")
            .with_description("Pairs well with a wireless mouse")
            .with_category("furniture")
            .with_price(219.0)
            .with_popularity(55),
        NewItem::new("USB hub").with_tags("usb,wireless-adapter").with_category("electronics").with_popularity(20),
    ];
    let written = engine.insert_items(&items).await?;
    println!("📝 Inserted {} items\n", written);

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Search
    // ─────────────────────────────────────────────────────────────────────────
    let query = SearchQuery::new("wireless").sort("price").order("asc").size(2);
    let response = engine.search_response(&query).await?;
    println!(
        "🔍 \"{}\": {} matches, page {}/{} ({} ms)",
        response.query, response.total, response.page, response.total_pages, response.response_time_ms
    );
    for hit in &response.items {
        println!(
            "   └─ #{} {} @ {:?}",
            hit.item.id,
            hit.highlight.as_deref().unwrap_or(&hit.item.title),
            hit.item.price
        );
    }
    println!("   Related: {:?}", response.suggestions);

    let filtered = engine
        .search(&SearchQuery::new("Wireless").category("electronics").max_price(30.0))
        .await?;
    println!("🔍 \"Wireless\" in electronics under 30: {} match(es)", filtered.total);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Suggestions and analytics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n💡 Autocomplete \"Wire\": {:?}", engine.autocomplete("Wire", 10).await?);

    let facets = engine.facets("mouse").await?;
    for facet in &facets.categories {
        println!("   facet {} = {}", facet.category, facet.count);
    }

    let suggestions = engine.suggestions().await?;
    println!("   popular: {:?}", suggestions.popular);
    println!("   recent:  {:?}", suggestions.recent);

    let stats = engine.stats().await?;
    println!(
        "📊 {} items, {} searches, avg {} ms",
        stats.total_items, stats.total_searches, stats.avg_response_time_ms
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Print captured counters and histogram summaries, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters: Vec<(String, String, u64)> = vec![];
    let mut histograms: Vec<(String, String, usize, f64)> = vec![];

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_kind, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((key.name().to_string(), label_str, v)),
            DebugValue::Histogram(samples) => {
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((key.name().to_string(), label_str, samples.len(), sum));
            }
            DebugValue::Gauge(_) => {}
        }
    }

    counters.sort();
    histograms.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    for (name, labels, value) in &counters {
        println!("   └─ {}{} = {}", name, labels, value);
    }
    for (name, labels, count, sum) in &histograms {
        println!("   └─ {}{} count={} sum={:.4}", name, labels, count, sum);
    }
}
