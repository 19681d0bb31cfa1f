use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::feed_keys::{feed_page_key, user_feed_prefix};
use crate::cache::manager::{CacheManager, CacheStats};
use crate::cache::models::FeedPage;

/// 动态流缓存操作
pub struct FeedCacheOperations {
    manager: Arc<CacheManager>,
}

impl FeedCacheOperations {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub async fn get_page(&self, user_id: &str, limit: i64, offset: i64) -> Option<FeedPage> {
        self.manager.get(&feed_page_key(user_id, limit, offset)).await
    }

    pub async fn put_page(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        page: &FeedPage,
        ttl: Option<Duration>,
    ) -> bool {
        self.manager
            .put(&feed_page_key(user_id, limit, offset), page, ttl)
            .await
    }

    /// 失效某个用户的全部分页
    pub async fn invalidate_owner(&self, user_id: &str) -> u64 {
        let deleted = self
            .manager
            .invalidate_by_prefix(&user_feed_prefix(user_id))
            .await;
        if deleted > 0 {
            tracing::debug!("Invalidated {} feed pages for user {}", deleted, user_id);
        }
        deleted
    }

    pub async fn stats(&self) -> CacheStats {
        self.manager.stats().await
    }
}
