use serde::Deserialize;
use sqlx::PgPool;

use crate::cache::models::{
    BrandPostsPage, Education, FeedPost, ProfileAbout, ProfileSummary, WorkExperience,
};

#[derive(Debug, Deserialize)]
pub struct UpdateAboutRequest {
    pub about: Option<String>,
}

pub async fn fetch_summary(
    pool: &PgPool,
    profile_id: &str,
) -> Result<Option<ProfileSummary>, sqlx::Error> {
    sqlx::query_as::<_, ProfileSummary>(
        r#"
        SELECT u.user_id, u.username, u.full_name, u.headline, u.profile_picture, u.is_brand,
               (SELECT COUNT(*) FROM connections c WHERE c.user_id = u.user_id) AS connection_count
        FROM users u
        WHERE u.user_id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_about(pool: &PgPool, profile_id: &str) -> Result<ProfileAbout, sqlx::Error> {
    let about = sqlx::query_as::<_, ProfileAbout>("SELECT about FROM users WHERE user_id = $1")
        .bind(profile_id)
        .fetch_optional(pool)
        .await?;
    Ok(about.unwrap_or(ProfileAbout { about: None }))
}

pub async fn update_about(
    pool: &PgPool,
    user_id: &str,
    about: Option<&str>,
) -> Result<ProfileAbout, sqlx::Error> {
    sqlx::query_as::<_, ProfileAbout>(
        "UPDATE users SET about = $1 WHERE user_id = $2 RETURNING about",
    )
    .bind(about)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn fetch_education(
    pool: &PgPool,
    profile_id: &str,
) -> Result<Vec<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>(
        r#"
        SELECT school, degree, field_of_study, start_year, end_year
        FROM education
        WHERE user_id = $1
        ORDER BY start_year DESC NULLS LAST
        "#,
    )
    .bind(profile_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_work(
    pool: &PgPool,
    profile_id: &str,
) -> Result<Vec<WorkExperience>, sqlx::Error> {
    sqlx::query_as::<_, WorkExperience>(
        r#"
        SELECT company, title, start_date, end_date, description
        FROM work_experience
        WHERE user_id = $1
        ORDER BY start_date DESC NULLS LAST
        "#,
    )
    .bind(profile_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_brand_posts(
    pool: &PgPool,
    profile_id: &str,
    limit: i64,
    offset: i64,
) -> Result<BrandPostsPage, sqlx::Error> {
    let mut posts = sqlx::query_as::<_, FeedPost>(
        r#"
        SELECT p.id, p.owner, p.content, u.username, u.full_name, u.profile_picture,
               p.likes, COALESCE(cc.count, 0) AS comment_count, p.created_at
        FROM posts p
        JOIN users u ON u.user_id = p.owner
        LEFT JOIN (
            SELECT post_id, COUNT(*) AS count FROM comments GROUP BY post_id
        ) cc ON cc.post_id = p.id
        WHERE p.owner = $1 AND u.is_brand
        ORDER BY p.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(profile_id)
    .bind(limit + 1)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let has_more = posts.len() as i64 > limit;
    posts.truncate(limit as usize);
    Ok(BrandPostsPage { posts, has_more })
}
