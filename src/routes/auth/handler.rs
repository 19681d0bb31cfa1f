use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    result::ApiResponse,
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{
    AuthResponse, LoginRequest, SignupRequest, User, is_valid_username, normalize_username,
};

fn issue_token(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let (token, expires_at) = generate_token(&user.user_id, &state.config)
        .map_err(|e| AppError::Internal(format!("token generation failed: {}", e)))?;
    Ok(AuthResponse {
        user_id: user.user_id,
        username: user.username,
        token,
        expires_at,
    })
}

/// 登录失败返回 401，失败次数会计入登录限流；成功的请求不计数
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let username = normalize_username(&req.username);
    let user = User::find_by_username(&state.pool, &username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.verify_login(&req.password) {
        tracing::info!("Failed login for {}", username);
        return Err(AppError::Unauthorized);
    }

    Ok(success_to_api_response(issue_token(&state, user)?))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let username = normalize_username(&req.username);
    if !is_valid_username(&username) {
        return Err(AppError::BadRequest(
            "Username must be 3-32 letters, digits, '_' or '.'".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let user = match User::create(&state.pool, &username, &req.password, req.full_name.as_deref())
        .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("Username already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::CREATED,
        success_to_api_response(issue_token(&state, user)?),
    ))
}

/// token 是无状态的，登出只需客户端丢弃 token；这里只做限流和记录
pub async fn logout(Extension(claims): Extension<Claims>) -> Json<ApiResponse<()>> {
    tracing::info!("User {} logged out", claims.sub);
    success_to_api_response(())
}
