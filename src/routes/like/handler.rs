use axum::extract::{Extension, Json, Path, State};

use crate::{
    AppState,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, success_to_api_response},
};

use super::model::{LikeState, toggle_like};

/// 点赞数在动态流缓存里允许短暂滞后，不触发失效
pub async fn like_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> Result<Json<ApiResponse<LikeState>>, AppError> {
    let like = toggle_like(&state.pool, &post_id, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(success_to_api_response(like))
}
