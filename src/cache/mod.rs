// 缓存模块
// 包含缓存键、缓存数据结构、通用缓存管理和各命名空间的操作

pub mod invalidation;
pub mod keys;
pub mod manager;
pub mod models;
pub mod operations;

// 重新导出常用类型，方便其他模块使用
pub use invalidation::{InvalidationCoordinator, RelationshipSource};
pub use manager::{CacheManager, CacheNamespace, CacheStats};
pub use operations::{
    FeedCacheOperations, JobCacheOperations, ProfileCacheOperations, SearchCacheOperations,
};
