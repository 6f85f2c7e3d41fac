// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL Translator
//!
//! Translates the [`Predicate`] AST into a parameterized `WHERE` clause over
//! the `search_items` columns, and a [`SortSpec`] into an `ORDER BY` list.
//! The output is valid for both SQLite and MySQL.
//!
//! # SQL Syntax Generated
//!
//! ```sql
//! category = ?                           -- Exact match
//! title LIKE ? ESCAPE '!'                -- Contains ('%kw%') / prefix ('kw%')
//! price BETWEEN ? AND ?                  -- Range
//! (title LIKE ? ESCAPE '!' OR tags LIKE ? ESCAPE '!')
//! ```
//!
//! Keywords are matched literally: `%`, `_` and the escape character itself
//! are escaped before they are wrapped in wildcards.

use super::predicate::{FieldMatch, MatchOp, MatchValue, Predicate, SortSpec};
use super::query::SortOrder;

/// Escape character used in every generated `LIKE`
pub const LIKE_ESCAPE: char = '!';

/// SQL query translator for catalog predicates
pub struct SqlTranslator;

/// SQL fragment with parameterized placeholders
#[derive(Debug, Clone)]
pub struct SqlClause {
    /// The clause (without the "WHERE" keyword)
    pub clause: String,
    /// The parameter values in order
    pub params: Vec<SqlParam>,
}

/// SQL parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Numeric(f64),
}

impl SqlTranslator {
    /// Translate a predicate to a parameterized SQL clause.
    ///
    /// Uses `?` placeholders, which both SQLite and MySQL accept.
    pub fn translate(predicate: &Predicate) -> SqlClause {
        let mut params = Vec::new();
        let clause = Self::translate_node(predicate, &mut params);
        SqlClause { clause, params }
    }

    /// Translate with inline values, for log output.
    ///
    /// Never execute the result; values are quoted, not bound.
    pub fn translate_inline(predicate: &Predicate) -> String {
        let SqlClause { clause, params } = Self::translate(predicate);

        let mut result = clause;
        for param in params {
            let value = match param {
                SqlParam::Text(s) => format!("'{}'", s.replace('\'', "''")),
                SqlParam::Numeric(n) => n.to_string(),
            };
            result = result.replacen('?', &value, 1);
        }
        result
    }

    /// Render an `ORDER BY` list (without the keywords).
    pub fn order_by(sort: &SortSpec) -> String {
        let direction = match sort.direction {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        format!("{} {}, id ASC", sort.field.column(), direction)
    }

    /// Escape `LIKE` metacharacters so `text` matches literally.
    pub fn escape_like(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '%' || c == '_' || c == LIKE_ESCAPE {
                escaped.push(LIKE_ESCAPE);
            }
            escaped.push(c);
        }
        escaped
    }

    fn translate_node(node: &Predicate, params: &mut Vec<SqlParam>) -> String {
        match node {
            Predicate::All => "1=1".to_string(),
            Predicate::Field(field_match) => Self::translate_field(field_match, params),
            Predicate::And(nodes) => Self::join(nodes, " AND ", params),
            Predicate::Or(nodes) => Self::join(nodes, " OR ", params),
        }
    }

    fn join(nodes: &[Predicate], separator: &str, params: &mut Vec<SqlParam>) -> String {
        let parts: Vec<String> = nodes
            .iter()
            .map(|n| Self::translate_node(n, params))
            .collect();
        match parts.len() {
            0 => "1=1".to_string(),
            1 => parts[0].clone(),
            _ => format!("({})", parts.join(separator)),
        }
    }

    fn translate_field(field: &FieldMatch, params: &mut Vec<SqlParam>) -> String {
        let column = field.field.column();

        match (&field.op, &field.value) {
            (MatchOp::Equals, MatchValue::Text(text)) => {
                params.push(SqlParam::Text(text.clone()));
                format!("{} = ?", column)
            }
            (MatchOp::Contains, MatchValue::Text(text)) => {
                params.push(SqlParam::Text(format!("%{}%", Self::escape_like(text))));
                format!("{} LIKE ? ESCAPE '{}'", column, LIKE_ESCAPE)
            }
            (MatchOp::Prefix, MatchValue::Text(text)) => {
                params.push(SqlParam::Text(format!("{}%", Self::escape_like(text))));
                format!("{} LIKE ? ESCAPE '{}'", column, LIKE_ESCAPE)
            }
            (MatchOp::Range, MatchValue::NumericRange { min, max }) => match (min, max) {
                (Some(min_val), Some(max_val)) => {
                    params.push(SqlParam::Numeric(*min_val));
                    params.push(SqlParam::Numeric(*max_val));
                    format!("{} BETWEEN ? AND ?", column)
                }
                (Some(min_val), None) => {
                    params.push(SqlParam::Numeric(*min_val));
                    format!("{} >= ?", column)
                }
                (None, Some(max_val)) => {
                    params.push(SqlParam::Numeric(*max_val));
                    format!("{} <= ?", column)
                }
                (None, None) => format!("{} IS NOT NULL", column),
            },
            // Unsupported combinations never match
            _ => "1=0".to_string(),
        }
    }
}
