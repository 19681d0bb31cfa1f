use super::{CacheKey, KeyPrefix};

/// 动态流缓存键前缀
pub const FEED_PREFIX: &str = "feed:connections";

/// 生成某个用户某一页动态的缓存键
pub fn feed_page_key(user_id: &str, limit: i64, offset: i64) -> CacheKey {
    CacheKey::new(FEED_PREFIX, user_id).part(limit).part(offset)
}

/// 某个用户全部分页的前缀
pub fn user_feed_prefix(user_id: &str) -> KeyPrefix {
    KeyPrefix::owner(FEED_PREFIX, user_id)
}
