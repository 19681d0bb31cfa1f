use super::{CacheKey, KeyPrefix};

/// 搜索结果缓存键前缀
pub const SEARCH_PREFIX: &str = "search";

/// 最近搜索列表键前缀
pub const RECENT_SEARCH_PREFIX: &str = "recent_searches";

/// 去掉首尾空白、转小写、合并连续空白
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 生成搜索结果缓存键，大小写和空白不同的同一查询共用一个键
pub fn search_key(query: &str, limit: i64, offset: i64) -> CacheKey {
    CacheKey::new(SEARCH_PREFIX, &normalize_query(query))
        .part(limit)
        .part(offset)
}

/// 某个查询全部分页的前缀
pub fn query_prefix(query: &str) -> KeyPrefix {
    KeyPrefix::owner(SEARCH_PREFIX, &normalize_query(query))
}

/// 生成用户最近搜索列表的键
pub fn recent_searches_key(user_id: &str) -> CacheKey {
    CacheKey::new(RECENT_SEARCH_PREFIX, user_id)
}
