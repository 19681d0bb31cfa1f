use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Serialize, FromRow)]
pub struct LikeState {
    pub likes: i32,
    pub liked: bool,
}

/// 点赞或取消点赞，在一条语句里完成切换
pub async fn toggle_like(
    pool: &PgPool,
    post_id: &str,
    user_id: &str,
) -> Result<Option<LikeState>, sqlx::Error> {
    sqlx::query_as::<_, LikeState>(
        r#"
        UPDATE posts SET
            liked_by = CASE WHEN $2 = ANY(liked_by)
                            THEN array_remove(liked_by, $2)
                            ELSE array_append(liked_by, $2) END,
            likes = CASE WHEN $2 = ANY(liked_by) THEN likes - 1 ELSE likes + 1 END
        WHERE id = $1
        RETURNING likes, $2 = ANY(liked_by) AS liked
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
