// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Predicate AST for catalog filters.
//!
//! Store-agnostic description of which items match and how they are ordered.
//! [`SqlTranslator`](super::SqlTranslator) renders it as a parameterized
//! `WHERE`/`ORDER BY`; the in-memory store evaluates it directly with
//! [`Predicate::matches`] and [`SortSpec::compare`].
//!
//! # Example
//!
//! ```rust
//! use catalog_search::search::{ItemField, Predicate, PredicateBuilder};
//!
//! // title OR description OR tags contains "lamp", AND category = "home"
//! let predicate = PredicateBuilder::new()
//!     .any_contains(&[ItemField::Title, ItemField::Description, ItemField::Tags], "lamp")
//!     .equals(ItemField::Category, "home")
//!     .build_and();
//!
//! match predicate {
//!     Predicate::And(nodes) => assert_eq!(nodes.len(), 2),
//!     _ => unreachable!(),
//! }
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::item::Item;
use super::query::SortOrder;

/// Filterable item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemField {
    Title,
    Description,
    Tags,
    Category,
    Price,
}

impl ItemField {
    /// Column name in the `search_items` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Tags => "tags",
            Self::Category => "category",
            Self::Price => "price",
        }
    }

    fn text<'a>(&self, item: &'a Item) -> Option<&'a str> {
        match self {
            Self::Title => Some(item.title.as_str()),
            Self::Description => item.description.as_deref(),
            Self::Tags => item.tags.as_deref(),
            Self::Category => item.category.as_deref(),
            Self::Price => None,
        }
    }
}

/// Field comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOp {
    /// Exact match
    Equals,
    /// Literal substring
    Contains,
    /// Literal prefix
    Prefix,
    /// Inclusive numeric range
    Range,
}

/// Value compared against a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchValue {
    Text(String),
    NumericRange { min: Option<f64>, max: Option<f64> },
}

/// A single field condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: ItemField,
    pub op: MatchOp,
    pub value: MatchValue,
}

/// Predicate AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every item
    All,
    Field(FieldMatch),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn contains(field: ItemField, text: impl Into<String>) -> Self {
        Self::Field(FieldMatch {
            field,
            op: MatchOp::Contains,
            value: MatchValue::Text(text.into()),
        })
    }

    pub fn prefix(field: ItemField, text: impl Into<String>) -> Self {
        Self::Field(FieldMatch {
            field,
            op: MatchOp::Prefix,
            value: MatchValue::Text(text.into()),
        })
    }

    pub fn equals(field: ItemField, text: impl Into<String>) -> Self {
        Self::Field(FieldMatch {
            field,
            op: MatchOp::Equals,
            value: MatchValue::Text(text.into()),
        })
    }

    pub fn range(field: ItemField, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Field(FieldMatch {
            field,
            op: MatchOp::Range,
            value: MatchValue::NumericRange { min, max },
        })
    }

    /// Any of `fields` contains `text`
    pub fn any_contains(fields: &[ItemField], text: &str) -> Self {
        let mut nodes: Vec<Predicate> = fields
            .iter()
            .map(|f| Self::contains(*f, text))
            .collect();
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Self::Or(nodes)
        }
    }

    /// Evaluate against an item (case-sensitive, like the SQLite store).
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Field(m) => m.matches(item),
            Self::And(nodes) => nodes.iter().all(|n| n.matches(item)),
            Self::Or(nodes) => nodes.iter().any(|n| n.matches(item)),
        }
    }
}

impl FieldMatch {
    fn matches(&self, item: &Item) -> bool {
        match (&self.op, &self.value) {
            (MatchOp::Range, MatchValue::NumericRange { min, max }) => {
                let value = match self.field {
                    ItemField::Price => item.price,
                    _ => None,
                };
                // NULL never satisfies a comparison
                let Some(value) = value else { return false };
                min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
            }
            (op, MatchValue::Text(text)) => {
                let Some(value) = self.field.text(item) else { return false };
                match op {
                    MatchOp::Equals => value == text,
                    MatchOp::Contains => value.contains(text.as_str()),
                    MatchOp::Prefix => value.starts_with(text.as_str()),
                    MatchOp::Range => false,
                }
            }
            // Unsupported combinations never match
            _ => false,
        }
    }
}

/// Builder for conjunctive/disjunctive predicates
#[derive(Default)]
pub struct PredicateBuilder {
    nodes: Vec<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn equals(mut self, field: ItemField, text: impl Into<String>) -> Self {
        self.nodes.push(Predicate::equals(field, text));
        self
    }

    pub fn contains(mut self, field: ItemField, text: impl Into<String>) -> Self {
        self.nodes.push(Predicate::contains(field, text));
        self
    }

    pub fn any_contains(mut self, fields: &[ItemField], text: &str) -> Self {
        self.nodes.push(Predicate::any_contains(fields, text));
        self
    }

    pub fn prefix(mut self, field: ItemField, text: impl Into<String>) -> Self {
        self.nodes.push(Predicate::prefix(field, text));
        self
    }

    pub fn range(mut self, field: ItemField, min: Option<f64>, max: Option<f64>) -> Self {
        self.nodes.push(Predicate::range(field, min, max));
        self
    }

    /// Push a node only when `cond` holds.
    pub fn push_if(mut self, cond: bool, node: impl FnOnce() -> Predicate) -> Self {
        if cond {
            self.nodes.push(node());
        }
        self
    }

    /// All constraints must match. No constraints matches everything.
    pub fn build_and(mut self) -> Predicate {
        match self.nodes.len() {
            0 => Predicate::All,
            1 => self.nodes.remove(0),
            _ => Predicate::And(self.nodes),
        }
    }
}

/// Sortable item columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    CreatedAt,
    Popularity,
    Price,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Popularity => "popularity",
            Self::Price => "price",
        }
    }
}

/// Resolved ordering: one field, one direction, `id` ascending as tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortOrder) -> Self {
        Self { field, direction }
    }

    /// Compare two items the way the SQL `ORDER BY` does (NULLs lowest).
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Popularity => a.popularity.cmp(&b.popularity),
            SortField::Price => compare_nullable(a.price, b.price),
        };
        let primary = match self.direction {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_nullable(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}
