use axum::extract::{Extension, Json, Query, State};

use crate::{
    AppState,
    cache::keys::search_keys::normalize_query,
    cache::models::SearchResults,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, Pagination, success_to_api_response},
};

use super::model::{RecentSearches, SearchQuery, run_search};

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let query = params.q.as_deref().map(normalize_query).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::BadRequest("No query found".into()));
    }
    let page = Pagination {
        limit: params.limit,
        offset: params.offset,
    };
    let (limit, offset) = (page.limit(), page.offset());

    state.search_cache.record_recent(&claims.sub, &query).await;

    if let Some(cached) = state.search_cache.get(&query, limit, offset).await {
        return Ok(success_to_api_response(cached));
    }

    let results = run_search(&state.pool, &query, limit, offset).await?;
    state
        .search_cache
        .put(&query, limit, offset, &results, None)
        .await;
    Ok(success_to_api_response(results))
}

pub async fn recent_searches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<ApiResponse<RecentSearches>> {
    let searches = state.search_cache.recent(&claims.sub).await;
    success_to_api_response(RecentSearches { searches })
}

pub async fn clear_recent_searches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<ApiResponse<()>> {
    state.search_cache.clear_recent(&claims.sub).await;
    success_to_api_response(())
}
