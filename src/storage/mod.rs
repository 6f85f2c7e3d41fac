// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage backends for the item catalog and the search log.
//!
//! - [`sql::SqlStore`]: SQLite or MySQL through sqlx's `Any` driver
//! - [`memory::InMemoryStore`]: `DashMap`-backed store for tests and embedding

pub mod traits;
pub mod sql;
pub mod memory;
