use axum::extract::{Extension, Json, Path, State};

use crate::{
    AppState,
    cache::keys::profile_keys::ProfileSection,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, success_to_api_response},
};

use super::model::{ConnectionChange, connect, disconnect, user_exists};

/// 关系变化影响双方的动态流和主页上的好友数
async fn after_relationship_change(state: &AppState, a: &str, b: &str, connected: bool) {
    let cleared = if connected {
        state.invalidation.on_connection_created(a, b).await
    } else {
        state.invalidation.on_connection_removed(a, b).await
    };
    for user in [a, b] {
        state
            .profile_cache
            .invalidate_section(user, ProfileSection::Summary)
            .await;
    }
    tracing::debug!("Connection {} <-> {} changed, cleared {} feed pages", a, b, cleared);
}

pub async fn add_connection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(connection_id): Path<String>,
) -> Result<Json<ApiResponse<ConnectionChange>>, AppError> {
    if connection_id == claims.sub {
        return Err(AppError::BadRequest("Cannot connect to yourself".into()));
    }
    if !user_exists(&state.pool, &connection_id).await? {
        return Err(AppError::NotFound("User"));
    }

    if connect(&state.pool, &claims.sub, &connection_id).await? {
        after_relationship_change(&state, &claims.sub, &connection_id, true).await;
    }

    Ok(success_to_api_response(ConnectionChange {
        user_id: claims.sub,
        connection_id,
        connected: true,
    }))
}

pub async fn remove_connection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(connection_id): Path<String>,
) -> Result<Json<ApiResponse<ConnectionChange>>, AppError> {
    if !disconnect(&state.pool, &claims.sub, &connection_id).await? {
        return Err(AppError::NotFound("Connection"));
    }

    after_relationship_change(&state, &claims.sub, &connection_id, false).await;

    Ok(success_to_api_response(ConnectionChange {
        user_id: claims.sub,
        connection_id,
        connected: false,
    }))
}
