//! 共享键值存储
//!
//! 限流器和缓存都只通过 [`KvStore`] 访问存储。生产环境使用 Redis，
//! 本地运行和测试使用进程内的 [`MemoryStore`]，两者语义一致：
//! 令牌桶和窗口计数的读-改-写都在一次往返内原子完成。

mod memory;
mod policy;
mod redis_store;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use policy::FailOpen;
pub use redis_store::RedisStore;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// 令牌桶脚本的返回值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketReply {
    pub allowed: bool,
    pub tokens: f64,
}

/// 窗口计数器自增后的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReply {
    pub count: u64,
    /// 当前窗口剩余毫秒数
    pub ttl_ms: u64,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// 删除给定的键，返回实际删除的数量
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// 按 glob 模式枚举键
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    async fn hash_set(&self, key: &str, fields: &[(&str, String)], ttl: Duration)
    -> StoreResult<()>;

    /// 去重后插入列表头部，截断到 max_len 并刷新过期时间
    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
        ttl: Duration,
    ) -> StoreResult<()>;

    async fn list_range(&self, key: &str, max_len: usize) -> StoreResult<Vec<String>>;

    /// 原子令牌桶：补充、判断、扣减、写回、刷新 TTL 在一次往返内完成
    async fn token_bucket(
        &self,
        key: &str,
        capacity: f64,
        refill_per_sec: f64,
        now_ms: i64,
        ttl: Duration,
    ) -> StoreResult<BucketReply>;

    /// 窗口计数器自增，窗口内第一次自增时设置过期时间
    async fn window_hit(&self, key: &str, window: Duration) -> StoreResult<WindowReply>;

    /// 撤销一次计数；窗口已过期则什么都不做
    async fn window_release(&self, key: &str) -> StoreResult<()>;
}

/// 键片段编码：`:` 是分隔符，`%` 是转义符，二者都要编码
pub fn encode_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

/// 把用户提供的片段转义成 glob 安全的字面量
pub fn escape_pattern(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
