use axum::extract::{Json, State};
use serde::Serialize;

use crate::{
    AppState,
    cache::CacheStats,
    result::ApiResponse,
    utils::success_to_api_response,
};

#[derive(Debug, Serialize)]
pub struct CacheOverview {
    pub feed: CacheStats,
    pub profile: CacheStats,
    pub jobs: CacheStats,
    pub search: CacheStats,
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<ApiResponse<CacheOverview>> {
    let (feed, profile, jobs, search) = futures_util::join!(
        state.feed_cache.stats(),
        state.profile_cache.stats(),
        state.job_cache.stats(),
        state.search_cache.stats(),
    );
    success_to_api_response(CacheOverview {
        feed,
        profile,
        jobs,
        search,
    })
}
