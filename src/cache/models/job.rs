use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CachePayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub posted_by: String,
    pub posted_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 一页职位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<JobListing>,
    pub has_more: bool,
}

impl CachePayload for JobPage {
    fn is_empty_result(&self) -> bool {
        self.jobs.is_empty()
    }
}
