use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CachePayload;

/// 动态流中的一条帖子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedPost {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
    pub likes: i32,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 一页动态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub feed: Vec<FeedPost>,
    pub has_more: bool,
}

impl CachePayload for FeedPage {
    fn is_empty_result(&self) -> bool {
        self.feed.is_empty()
    }
}
