use serde::Deserialize;
use sqlx::PgPool;

use crate::cache::models::{JobListing, JobPage};

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
}

/// 在招职位，不包含自己发布的
pub async fn fetch_job_page(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<JobPage, sqlx::Error> {
    let mut jobs = sqlx::query_as::<_, JobListing>(
        r#"
        SELECT j.id, j.title, j.company, j.location, j.job_type, j.description,
               j.posted_by, u.full_name AS posted_by_name, j.created_at
        FROM jobs j
        LEFT JOIN users u ON u.user_id = j.posted_by
        WHERE j.status = 'active' AND j.posted_by <> $1
        ORDER BY j.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit + 1)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let has_more = jobs.len() as i64 > limit;
    jobs.truncate(limit as usize);
    Ok(JobPage { jobs, has_more })
}

pub async fn create_job(
    pool: &PgPool,
    user_id: &str,
    req: &CreateJobRequest,
) -> Result<JobListing, sqlx::Error> {
    sqlx::query_as::<_, JobListing>(
        r#"
        WITH inserted AS (
            INSERT INTO jobs (id, title, company, location, job_type, description, posted_by, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
            RETURNING *
        )
        SELECT i.id, i.title, i.company, i.location, i.job_type, i.description,
               i.posted_by, u.full_name AS posted_by_name, i.created_at
        FROM inserted i
        LEFT JOIN users u ON u.user_id = i.posted_by
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(req.title.trim())
    .bind(req.company.trim())
    .bind(&req.location)
    .bind(&req.job_type)
    .bind(&req.description)
    .bind(user_id)
    .fetch_one(pool)
    .await
}
