// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search query model and predicate translation.
//!
//! # Architecture
//!
//! ```text
//! SearchQuery (request value)
//!     ↓  engine: predicate construction + sort policy
//! Predicate + SortSpec (AST)
//!     ├─→ SqlTranslator → WHERE / ORDER BY with ? placeholders
//!     └─→ Predicate::matches / SortSpec::compare (in-memory store)
//! ```
//!
//! # Matching rules
//!
//! ```text
//! keyword       - literal substring of title OR description OR tags
//! category      - exact match
//! min/max price - inclusive bounds, NULL price never matches
//! ```

mod predicate;
mod query;
mod sql_translator;

pub use predicate::{
    FieldMatch, ItemField, MatchOp, MatchValue, Predicate, PredicateBuilder, SortField, SortSpec,
};
pub use query::{SearchQuery, SortKey, SortOrder, DEFAULT_PAGE_SIZE};
pub use sql_translator::{SqlClause, SqlParam, SqlTranslator, LIKE_ESCAPE};
