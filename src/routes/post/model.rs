use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Deserialize)]
pub struct PostContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Post {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub async fn create(pool: &PgPool, owner: &str, content: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, owner, content)
            VALUES ($1, $2, $3)
            RETURNING id, owner, content, likes, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(owner)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    /// 只能修改自己的帖子，不是自己的返回 None
    pub async fn update_content(
        pool: &PgPool,
        post_id: &str,
        owner: &str,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET content = $1
            WHERE id = $2 AND owner = $3
            RETURNING id, owner, content, likes, created_at
            "#,
        )
        .bind(content)
        .bind(post_id)
        .bind(owner)
        .fetch_optional(pool)
        .await
    }
}
