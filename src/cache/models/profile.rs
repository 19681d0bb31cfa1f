use serde::{Deserialize, Serialize};

use super::CachePayload;
use super::feed::FeedPost;

/// 主页概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileSummary {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub profile_picture: Option<String>,
    pub is_brand: bool,
    pub connection_count: i64,
}

impl CachePayload for ProfileSummary {
    fn is_empty_result(&self) -> bool {
        false
    }
}

/// 关于我
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileAbout {
    pub about: Option<String>,
}

impl CachePayload for ProfileAbout {
    fn is_empty_result(&self) -> bool {
        self.about.as_deref().is_none_or(|s| s.trim().is_empty())
    }
}

/// 教育经历
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Education {
    pub school: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// 工作经历
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkExperience {
    pub company: String,
    pub title: String,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub description: Option<String>,
}

/// 品牌主页的一页帖子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandPostsPage {
    pub posts: Vec<FeedPost>,
    pub has_more: bool,
}

impl CachePayload for BrandPostsPage {
    fn is_empty_result(&self) -> bool {
        self.posts.is_empty()
    }
}
