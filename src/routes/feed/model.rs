use sqlx::PgPool;

use crate::cache::models::{FeedPage, FeedPost};

/// 多查一条用来判断是否还有下一页
pub async fn fetch_feed_page(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<FeedPage, sqlx::Error> {
    let mut feed = sqlx::query_as::<_, FeedPost>(
        r#"
        SELECT p.id, p.owner, p.content, u.username, u.full_name, u.profile_picture,
               p.likes, COALESCE(cc.count, 0) AS comment_count, p.created_at
        FROM posts p
        JOIN connections c ON c.connection_id = p.owner
        JOIN users u ON u.user_id = p.owner
        LEFT JOIN (
            SELECT post_id, COUNT(*) AS count FROM comments GROUP BY post_id
        ) cc ON cc.post_id = p.id
        WHERE c.user_id = $1
        ORDER BY p.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit + 1)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let has_more = feed.len() as i64 > limit;
    feed.truncate(limit as usize);
    Ok(FeedPage { feed, has_more })
}
