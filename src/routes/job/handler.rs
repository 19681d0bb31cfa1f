use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    cache::models::{JobListing, JobPage},
    error::AppError,
    result::ApiResponse,
    utils::{Claims, Pagination, success_to_api_response},
};

use super::model::{CreateJobRequest, create_job, fetch_job_page};

pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<JobPage>>, AppError> {
    let (limit, offset) = (page.limit(), page.offset());

    if let Some(cached) = state.job_cache.get_page(&claims.sub, limit, offset).await {
        return Ok(success_to_api_response(cached));
    }

    let jobs = fetch_job_page(&state.pool, &claims.sub, limit, offset).await?;
    state
        .job_cache
        .put_page(&claims.sub, limit, offset, &jobs, None)
        .await;
    Ok(success_to_api_response(jobs))
}

pub async fn post_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobListing>>), AppError> {
    if req.title.trim().is_empty() || req.company.trim().is_empty() {
        return Err(AppError::BadRequest("Title and company are required".into()));
    }

    let job = create_job(&state.pool, &claims.sub, &req).await?;

    // 职位列表按浏览者分别缓存，新职位影响所有人
    let cleared = state.job_cache.clear_all().await;
    tracing::info!("Job {} posted, cleared {} cached job pages", job.id, cleared);

    Ok((StatusCode::CREATED, success_to_api_response(job)))
}
