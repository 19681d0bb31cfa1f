/// 缓存数据模型
/// 定义缓存内容的结构体，同时也是数据库查询的结果类型

// 动态流
pub mod feed;

// 个人主页
pub mod profile;

// 职位
pub mod job;

// 搜索
pub mod search;

/// 判断缓存内容是否为空结果，空结果使用更短的过期时间
pub trait CachePayload {
    fn is_empty_result(&self) -> bool;
}

impl<T> CachePayload for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

/// None 表示实体不存在，同样按空结果缓存
impl<T: CachePayload> CachePayload for Option<T> {
    fn is_empty_result(&self) -> bool {
        self.as_ref().is_none_or(CachePayload::is_empty_result)
    }
}

// 重新导出常用类型
pub use feed::{FeedPage, FeedPost};
pub use job::{JobListing, JobPage};
pub use profile::{BrandPostsPage, Education, ProfileAbout, ProfileSummary, WorkExperience};
pub use search::{SearchPost, SearchResults, SearchUser};
