/// 缓存操作
/// 每个命名空间一个操作类型，都建立在 `CacheManager` 之上

// 动态流缓存操作
pub mod feed;

// 个人主页缓存操作
pub mod profile;

// 职位缓存操作
pub mod job;

// 搜索缓存操作
pub mod search;

// 重新导出常用操作
pub use feed::FeedCacheOperations;
pub use job::JobCacheOperations;
pub use profile::ProfileCacheOperations;
pub use search::SearchCacheOperations;
