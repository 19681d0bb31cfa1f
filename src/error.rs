use std::time::Duration;

use axum::Json;
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::limiter::QuotaSnapshot;
use crate::utils::{error_codes, error_to_api_response};

/// 键值存储层错误，只在存储适配器和容错策略之间流转，不会返回给调用方
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        // Redis 侧超时没有时长信息，按不可用处理；Timeout 只由 FailOpen 的截止时间产生
        if e.is_timeout()
            || e.is_io_error()
            || e.is_connection_dropped()
            || e.is_connection_refusal()
        {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Protocol(e.to_string())
        }
    }
}

/// 路由处理函数的错误
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "Unauthorized".to_string(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                msg.clone(),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                format!("{} not found", what),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, error_codes::USER_EXISTS, msg.clone()),
            // 数据库细节只进日志
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}

/// 限流拒绝，唯一一个对用户可见的限流层错误
#[derive(Debug, Clone)]
pub struct RateLimitRejection {
    pub message: String,
    pub retry_after: Option<u64>,
    pub quota: Option<QuotaSnapshot>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectionBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let body = Json(RejectionBody {
            success: false,
            message: &self.message,
            retry_after: self.retry_after,
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();

        let headers = response.headers_mut();
        if let Some(quota) = &self.quota {
            quota.write_headers(headers);
        }
        if let Some(secs) = self.retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}
