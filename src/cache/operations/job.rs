use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::job_keys::job_page_key;
use crate::cache::manager::{CacheManager, CacheStats};
use crate::cache::models::JobPage;

/// 职位列表缓存操作
pub struct JobCacheOperations {
    manager: Arc<CacheManager>,
}

impl JobCacheOperations {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub async fn get_page(&self, user_id: &str, limit: i64, offset: i64) -> Option<JobPage> {
        self.manager.get(&job_page_key(user_id, limit, offset)).await
    }

    pub async fn put_page(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        page: &JobPage,
        ttl: Option<Duration>,
    ) -> bool {
        self.manager
            .put(&job_page_key(user_id, limit, offset), page, ttl)
            .await
    }

    /// 新职位对所有人可见，发布后清空整个命名空间
    pub async fn clear_all(&self) -> u64 {
        self.manager.clear().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.manager.stats().await
    }
}
