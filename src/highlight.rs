// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Keyword highlighting for result titles.
//!
//! The query is escaped before it is compiled, so regex metacharacters in
//! user input only ever match themselves.

use regex::RegexBuilder;
use tracing::debug;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Wrap every case-insensitive occurrence of `query` in `<mark>` tags.
///
/// ```
/// use catalog_search::highlight::highlight_text;
///
/// assert_eq!(highlight_text("hello world", "world"), "hello <mark>world</mark>");
/// assert_eq!(highlight_text("Rust (2021)", "(2021)"), "Rust <mark>(2021)</mark>");
/// assert_eq!(highlight_text("unchanged", ""), "unchanged");
/// ```
pub fn highlight_text(text: &str, query: &str) -> String {
    highlight_with(text, query, MARK_OPEN, MARK_CLOSE)
}

/// Like [`highlight_text`] with caller-supplied markers.
///
/// Matches are non-overlapping and scanned left to right. The matched text
/// keeps its original casing.
pub fn highlight_with(text: &str, query: &str, open: &str, close: &str) -> String {
    if text.is_empty() || query.is_empty() {
        return text.to_string();
    }

    let re = match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            // Only reachable for pathological lengths (size limit)
            debug!(error = %e, "Highlight pattern rejected");
            return text.to_string();
        }
    };

    re.replace_all(text, |caps: &regex::Captures| {
        format!("{}{}{}", open, &caps[0], close)
    })
    .into_owned()
}
