use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::search_keys::{normalize_query, query_prefix, recent_searches_key, search_key};
use crate::cache::manager::{CacheManager, CacheStats};
use crate::cache::models::SearchResults;
use crate::store::{FailOpen, KvStore};

/// 最近搜索最多保留的条数
pub const MAX_RECENT_SEARCHES: usize = 10;

/// 最近搜索列表的过期时间（30天），每次写入都会刷新
pub const RECENT_SEARCH_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// 搜索缓存操作
pub struct SearchCacheOperations {
    manager: Arc<CacheManager>,
    store: Arc<dyn KvStore>,
    policy: FailOpen,
}

impl SearchCacheOperations {
    pub fn new(manager: Arc<CacheManager>, store: Arc<dyn KvStore>, policy: FailOpen) -> Self {
        Self {
            manager,
            store,
            policy,
        }
    }

    pub async fn get(&self, query: &str, limit: i64, offset: i64) -> Option<SearchResults> {
        self.manager.get(&search_key(query, limit, offset)).await
    }

    pub async fn put(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
        results: &SearchResults,
        ttl: Option<Duration>,
    ) -> bool {
        self.manager
            .put(&search_key(query, limit, offset), results, ttl)
            .await
    }

    /// 失效某个查询的全部分页
    pub async fn invalidate_query(&self, query: &str) -> u64 {
        self.manager.invalidate_by_prefix(&query_prefix(query)).await
    }

    pub async fn invalidate_all(&self) -> u64 {
        self.manager.clear().await
    }

    /// 记录一次搜索：去重、插到最前、截断、刷新过期时间
    pub async fn record_recent(&self, user_id: &str, query: &str) -> bool {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return false;
        }

        let key = recent_searches_key(user_id);
        self.policy
            .guard(
                "recent_search_add",
                key.as_str(),
                self.store.list_push_capped(
                    key.as_str(),
                    &normalized,
                    MAX_RECENT_SEARCHES,
                    RECENT_SEARCH_TTL,
                ),
            )
            .await
            .is_ok()
    }

    /// 最近搜索，最新的在前
    pub async fn recent(&self, user_id: &str) -> Vec<String> {
        let key = recent_searches_key(user_id);
        self.policy
            .or(
                "recent_search_get",
                key.as_str(),
                self.store.list_range(key.as_str(), MAX_RECENT_SEARCHES),
                Vec::new(),
            )
            .await
    }

    pub async fn clear_recent(&self, user_id: &str) -> u64 {
        let key = recent_searches_key(user_id);
        self.policy
            .or(
                "recent_search_clear",
                key.as_str(),
                self.store.del(&[key.as_str().to_string()]),
                0,
            )
            .await
    }

    pub async fn stats(&self) -> CacheStats {
        self.manager.stats().await
    }
}
