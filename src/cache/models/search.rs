use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CachePayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchUser {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchPost {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 一次搜索的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub users: Vec<SearchUser>,
    pub posts: Vec<SearchPost>,
}

impl CachePayload for SearchResults {
    fn is_empty_result(&self) -> bool {
        self.users.is_empty() && self.posts.is_empty()
    }
}
