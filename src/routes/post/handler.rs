use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, success_to_api_response},
};

use super::model::{Post, PostContentRequest};

const MAX_POST_CHARS: usize = 3000;

fn validate_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() || content.chars().count() > MAX_POST_CHARS {
        return Err(AppError::BadRequest(format!(
            "Post content must be 1-{} characters",
            MAX_POST_CHARS
        )));
    }
    Ok(content)
}

/// 帖子变更后失效作者所有好友的动态流和作者自己的品牌帖子列表
async fn after_content_change(state: &AppState, owner: &str) {
    state.invalidation.on_content_changed(owner).await;
    state.profile_cache.invalidate_brand_posts(owner).await;
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostContentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Post>>), AppError> {
    let content = validate_content(&req.content)?;
    let post = Post::create(&state.pool, &claims.sub, content).await?;

    after_content_change(&state, &claims.sub).await;
    Ok((StatusCode::CREATED, success_to_api_response(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Json(req): Json<PostContentRequest>,
) -> Result<Json<ApiResponse<Post>>, AppError> {
    let content = validate_content(&req.content)?;
    let post = Post::update_content(&state.pool, &post_id, &claims.sub, content)
        .await?
        .ok_or(AppError::NotFound("Post"))?;

    after_content_change(&state, &claims.sub).await;
    Ok(success_to_api_response(post))
}
