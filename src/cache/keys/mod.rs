/// 缓存键模块
/// 每个命名空间一个键生成模块，键只由命名空间、实体 ID 和分页参数决定
use std::fmt;

use crate::store::{encode_segment, escape_pattern};

// 动态流缓存键
pub mod feed_keys;

// 个人主页缓存键
pub mod profile_keys;

// 职位缓存键
pub mod job_keys;

// 搜索缓存键
pub mod search_keys;

/// 完整的缓存键 `<prefix>:<owner>[:<part>...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prefix: &'static str, owner: &str) -> Self {
        Self(format!("{}:{}", prefix, encode_segment(owner)))
    }

    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(&encode_segment(&part.to_string()));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 键前缀，用于按实体或整个命名空间批量失效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// 整个命名空间
    pub fn namespace(prefix: &'static str) -> Self {
        Self(format!("{}:", prefix))
    }

    /// 某个实体的全部键
    pub fn owner(prefix: &'static str, owner: &str) -> Self {
        Self(format!("{}:{}:", prefix, encode_segment(owner)))
    }

    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.0.push_str(&encode_segment(&part.to_string()));
        self.0.push(':');
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 对应的 glob 模式
    pub fn pattern(&self) -> String {
        format!("{}*", escape_pattern(&self.0))
    }
}

/// 键片段解码，和 `encode_segment` 互逆
pub fn decode_segment(segment: &str) -> String {
    segment.replace("%3A", ":").replace("%25", "%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_reproducible_from_its_parts() {
        let a = CacheKey::new("jobs", "7").part(10).part(0);
        let b = CacheKey::new("jobs", "7").part(10).part(0);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "jobs:7:10:0");
    }

    #[test]
    fn owner_prefix_does_not_match_longer_ids() {
        let prefix = KeyPrefix::owner("jobs", "1");
        assert_eq!(prefix.pattern(), "jobs:1:*");
        assert!(!CacheKey::new("jobs", "12").as_str().starts_with(prefix.as_str()));
    }

    #[test]
    fn segments_cannot_forge_separators() {
        let key = CacheKey::new("jobs", "1:10").part(0);
        assert_eq!(key.as_str(), "jobs:1%3A10:0");
        assert_eq!(decode_segment("1%3A10"), "1:10");
        assert_eq!(decode_segment("100%25"), "100%");
    }

    #[test]
    fn nested_prefix() {
        let prefix = KeyPrefix::owner("profile", "9").part("brand_posts");
        assert_eq!(prefix.as_str(), "profile:9:brand_posts:");
    }
}
