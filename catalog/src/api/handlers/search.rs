//! Search surface: simple query, full `SearchQuery` body, suggestions (§6).

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;

use crate::api::models::search::{SimpleSearchQuery, SuggestQuery};
use crate::app_state::AppState;
use crate::errors::Result;
use crate::search::query::{Filters, Pagination, SearchQuery, SearchStrategy, SortKey};

use super::ok;

pub async fn simple(State(state): State<AppState>, Query(params): Query<SimpleSearchQuery>) -> Result<Response> {
    let query = SearchQuery {
        text: Some(params.q),
        strategy: SearchStrategy::Hybrid,
        filters: Filters::default(),
        sort: vec![SortKey {
            field: crate::search::query::SortField::Relevance,
            direction: crate::search::query::SortDirection::Desc,
        }],
        pagination: Pagination::Page { page: 1, page_size: params.limit.clamp(1, 100) },
        fuzzy_threshold: state.config.search.fuzzy_threshold,
        include_suggestions: false,
        highlight: true,
    };

    let response = state.search.search(&query).await?;
    Ok(ok(response))
}

pub async fn advanced(State(state): State<AppState>, Json(query): Json<SearchQuery>) -> Result<Response> {
    let response = state.search.search(&query).await?;
    Ok(ok(response))
}

pub async fn suggestions(State(state): State<AppState>, Query(params): Query<SuggestQuery>) -> Result<Response> {
    let mut suggestions = state.search.suggestions().await?;
    if let Some(prefix) = &params.q {
        suggestions.retain(|s| s.to_lowercase().starts_with(&prefix.to_lowercase()));
    }
    suggestions.truncate(params.limit);
    Ok(ok(suggestions))
}
