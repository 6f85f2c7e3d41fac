// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use uuid::Uuid;

use crate::highlight::highlight_text;
use crate::search::SearchQuery;

use super::types::{round2, total_pages, HighlightedItem, SearchError, SearchResponse};
use super::SearchEngine;

impl SearchEngine {
    /// Run a search and assemble everything a results page needs: the
    /// highlighted page, facets for the keyword, related suggestions and
    /// paging metadata.
    ///
    /// Search and facet failures are returned. Related suggestions degrade
    /// to an empty list.
    pub async fn search_response(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let outcome = self.search(query).await?;
        let facets = self.facets(&query.keyword).await?;
        let suggestions = self
            .related_suggestions(&query.keyword, self.config.related_limit)
            .await;

        let items = outcome
            .items
            .into_iter()
            .map(|item| {
                let highlight = (!query.keyword.is_empty())
                    .then(|| highlight_text(&item.title, &query.keyword));
                HighlightedItem { item, highlight }
            })
            .collect();

        Ok(SearchResponse {
            query: query.keyword.clone(),
            total: outcome.total,
            page: query.page,
            size: query.size,
            total_pages: total_pages(outcome.total, query.size),
            items,
            response_time_ms: round2(outcome.elapsed_ms),
            facets,
            search_id: Uuid::new_v4().to_string(),
            cache_hit: false,
            suggestions,
        })
    }
}
