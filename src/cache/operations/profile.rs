use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::cache::keys::profile_keys::{
    ProfileSection, brand_posts_key, brand_posts_prefix, profile_prefix, profile_section_key,
};
use crate::cache::manager::{CacheManager, CacheStats};
use crate::cache::models::{BrandPostsPage, CachePayload};

/// 个人主页缓存操作
/// 主页按分组缓存，修改某个分组只需失效该分组
pub struct ProfileCacheOperations {
    manager: Arc<CacheManager>,
}

impl ProfileCacheOperations {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub async fn get_section<T: DeserializeOwned>(
        &self,
        profile_id: &str,
        section: ProfileSection,
    ) -> Option<T> {
        self.manager
            .get(&profile_section_key(profile_id, section))
            .await
    }

    pub async fn put_section<T: Serialize + CachePayload>(
        &self,
        profile_id: &str,
        section: ProfileSection,
        payload: &T,
        ttl: Option<Duration>,
    ) -> bool {
        self.manager
            .put(&profile_section_key(profile_id, section), payload, ttl)
            .await
    }

    pub async fn invalidate_section(&self, profile_id: &str, section: ProfileSection) -> u64 {
        self.manager
            .invalidate(&profile_section_key(profile_id, section))
            .await
    }

    pub async fn get_brand_posts(
        &self,
        profile_id: &str,
        limit: i64,
        offset: i64,
    ) -> Option<BrandPostsPage> {
        self.manager
            .get(&brand_posts_key(profile_id, limit, offset))
            .await
    }

    pub async fn put_brand_posts(
        &self,
        profile_id: &str,
        limit: i64,
        offset: i64,
        page: &BrandPostsPage,
        ttl: Option<Duration>,
    ) -> bool {
        self.manager
            .put(&brand_posts_key(profile_id, limit, offset), page, ttl)
            .await
    }

    pub async fn invalidate_brand_posts(&self, profile_id: &str) -> u64 {
        self.manager
            .invalidate_by_prefix(&brand_posts_prefix(profile_id))
            .await
    }

    /// 失效某个主页的全部分组
    pub async fn invalidate_profile(&self, profile_id: &str) -> u64 {
        self.manager
            .invalidate_by_prefix(&profile_prefix(profile_id))
            .await
    }

    pub async fn stats(&self) -> CacheStats {
        self.manager.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::profile_keys::PROFILE_PREFIX;
    use crate::cache::manager::CacheNamespace;
    use crate::cache::models::{Education, ProfileAbout};
    use crate::clock::ManualClock;
    use crate::store::{FailOpen, MemoryStore};

    fn profile_cache() -> (Arc<MemoryStore>, ProfileCacheOperations) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryStore::new(clock));
        let namespace = CacheNamespace::new(
            PROFILE_PREFIX,
            Duration::from_secs(1800),
            Duration::from_secs(300),
        )
        .unwrap();
        let manager = Arc::new(CacheManager::new(
            store.clone(),
            namespace,
            FailOpen::default(),
        ));
        (store, ProfileCacheOperations::new(manager))
    }

    fn about(text: &str) -> ProfileAbout {
        ProfileAbout {
            about: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn section_invalidation_leaves_other_sections() {
        let (_, ops) = profile_cache();
        ops.put_section("9", ProfileSection::About, &about("hi"), None)
            .await;
        ops.put_section("9", ProfileSection::Education, &Vec::<Education>::new(), None)
            .await;

        assert_eq!(ops.invalidate_section("9", ProfileSection::About).await, 1);
        assert_eq!(
            ops.get_section::<ProfileAbout>("9", ProfileSection::About)
                .await,
            None
        );
        assert_eq!(
            ops.get_section::<Vec<Education>>("9", ProfileSection::Education)
                .await,
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn empty_section_uses_short_ttl() {
        let (store, ops) = profile_cache();
        ops.put_section("9", ProfileSection::About, &about("  "), None)
            .await;
        ops.put_section("9", ProfileSection::Work, &about("builder"), None)
            .await;

        let key = |s| profile_section_key("9", s).as_str().to_string();
        assert_eq!(store.ttl_ms(&key(ProfileSection::About)), Some(300_000));
        assert_eq!(store.ttl_ms(&key(ProfileSection::Work)), Some(1_800_000));
    }

    #[tokio::test]
    async fn profile_invalidation_drops_every_section() {
        let (_, ops) = profile_cache();
        let page = BrandPostsPage {
            posts: Vec::new(),
            has_more: false,
        };
        ops.put_section("9", ProfileSection::About, &about("hi"), None)
            .await;
        ops.put_brand_posts("9", 10, 0, &page, None).await;
        ops.put_brand_posts("9", 10, 10, &page, None).await;
        ops.put_section("90", ProfileSection::About, &about("hi"), None)
            .await;

        assert_eq!(ops.invalidate_brand_posts("9").await, 2);
        assert_eq!(ops.invalidate_profile("9").await, 1);
        assert_eq!(ops.stats().await.total_keys, 1);
    }
}
