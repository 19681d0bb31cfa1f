use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::utils::{hash_password, verify_password};

#[derive(Debug, FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub username: String,
    pub token: String,
    pub expires_at: i64,
}

/// 用户名统一小写，和限流键的规则一致
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn is_valid_username(username: &str) -> bool {
    (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl User {
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let password_hash = hash_password(password)
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to hash password: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, username, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, username, password_hash
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(username)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created user: {}", user.user_id);
        Ok(user)
    }

    pub fn verify_login(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash).unwrap_or_else(|e| {
            tracing::warn!("Stored password hash for {} is unreadable: {}", self.user_id, e);
            false
        })
    }
}
