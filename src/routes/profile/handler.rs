use std::future::Future;

use axum::extract::{Extension, Json, Path, Query, State};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    AppState,
    cache::keys::profile_keys::ProfileSection,
    cache::models::{
        BrandPostsPage, CachePayload, Education, ProfileAbout, ProfileSummary, WorkExperience,
    },
    error::AppError,
    result::ApiResponse,
    utils::{Claims, Pagination, success_to_api_response},
};

use super::model::{
    UpdateAboutRequest, fetch_about, fetch_brand_posts, fetch_education, fetch_summary,
    fetch_work, update_about,
};

/// 先读缓存，未命中时回源并写回
async fn cached_section<T, F, Fut>(
    state: &AppState,
    profile_id: &str,
    section: ProfileSection,
    load: F,
) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + CachePayload,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    if let Some(cached) = state.profile_cache.get_section(profile_id, section).await {
        return Ok(cached);
    }

    let fresh = load().await?;
    state
        .profile_cache
        .put_section(profile_id, section, &fresh, None)
        .await;
    Ok(fresh)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<ProfileSummary>>, AppError> {
    // 不存在的主页也会按空结果短暂缓存
    let summary: Option<ProfileSummary> =
        cached_section(&state, &profile_id, ProfileSection::Summary, || {
            fetch_summary(&state.pool, &profile_id)
        })
        .await?;

    summary
        .map(success_to_api_response)
        .ok_or(AppError::NotFound("Profile"))
}

pub async fn get_about(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<ProfileAbout>>, AppError> {
    let about = cached_section(&state, &profile_id, ProfileSection::About, || {
        fetch_about(&state.pool, &profile_id)
    })
    .await?;
    Ok(success_to_api_response(about))
}

pub async fn get_education(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Education>>>, AppError> {
    let education = cached_section(&state, &profile_id, ProfileSection::Education, || {
        fetch_education(&state.pool, &profile_id)
    })
    .await?;
    Ok(success_to_api_response(education))
}

pub async fn get_work(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<WorkExperience>>>, AppError> {
    let work = cached_section(&state, &profile_id, ProfileSection::Work, || {
        fetch_work(&state.pool, &profile_id)
    })
    .await?;
    Ok(success_to_api_response(work))
}

pub async fn get_brand_posts(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<BrandPostsPage>>, AppError> {
    let (limit, offset) = (page.limit(), page.offset());

    if let Some(cached) = state
        .profile_cache
        .get_brand_posts(&profile_id, limit, offset)
        .await
    {
        return Ok(success_to_api_response(cached));
    }

    let posts = fetch_brand_posts(&state.pool, &profile_id, limit, offset).await?;
    state
        .profile_cache
        .put_brand_posts(&profile_id, limit, offset, &posts, None)
        .await;
    Ok(success_to_api_response(posts))
}

pub async fn put_about(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAboutRequest>,
) -> Result<Json<ApiResponse<ProfileAbout>>, AppError> {
    let about = req.about.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if about.is_some_and(|s| s.chars().count() > 2000) {
        return Err(AppError::BadRequest("About must be at most 2000 characters".into()));
    }

    let updated = update_about(&state.pool, &claims.sub, about).await?;
    state
        .profile_cache
        .invalidate_section(&claims.sub, ProfileSection::About)
        .await;

    Ok(success_to_api_response(updated))
}
