use axum::extract::{Extension, Json, Query, State};

use crate::{
    AppState,
    cache::models::FeedPage,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, Pagination, success_to_api_response},
};

use super::model::fetch_feed_page;

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<FeedPage>>, AppError> {
    let (limit, offset) = (page.limit(), page.offset());

    if let Some(cached) = state.feed_cache.get_page(&claims.sub, limit, offset).await {
        return Ok(success_to_api_response(cached));
    }

    let feed = fetch_feed_page(&state.pool, &claims.sub, limit, offset).await?;
    state
        .feed_cache
        .put_page(&claims.sub, limit, offset, &feed, None)
        .await;

    Ok(success_to_api_response(feed))
}
