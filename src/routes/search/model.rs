use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::cache::models::{SearchPost, SearchResults, SearchUser};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecentSearches {
    pub searches: Vec<String>,
}

pub async fn run_search(
    pool: &PgPool,
    query: &str,
    limit: i64,
    offset: i64,
) -> Result<SearchResults, sqlx::Error> {
    let users = sqlx::query_as::<_, SearchUser>(
        r#"
        SELECT user_id, username, full_name, headline, profile_picture
        FROM users
        WHERE search_vector @@ plainto_tsquery('english', $1)
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool);

    let posts = sqlx::query_as::<_, SearchPost>(
        r#"
        SELECT id, owner, content, created_at
        FROM posts
        WHERE search_vector @@ plainto_tsquery('english', $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool);

    let (users, posts) = futures_util::try_join!(users, posts)?;
    Ok(SearchResults { users, posts })
}
