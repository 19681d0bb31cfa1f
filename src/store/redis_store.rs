use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient, Script};

use super::{BucketReply, KvStore, StoreResult, WindowReply};
use crate::error::StoreError;

/// 令牌桶：KEYS[1] 桶，ARGV = 容量、每秒补充量、当前毫秒、保底 TTL 毫秒。
/// 返回 {是否放行, 剩余令牌}，令牌用字符串返回以保留小数。
const TOKEN_BUCKET_LUA: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local ttl = tonumber(ARGV[4])

local data = redis.call("HMGET", key, "tokens", "last_refill")
local tokens = tonumber(data[1])
local last_refill = tonumber(data[2])

if tokens == nil or last_refill == nil then
  tokens = capacity
  last_refill = now
end

local elapsed = math.max(0, now - last_refill) / 1000
tokens = math.min(capacity, tokens + elapsed * refill_rate)

local allowed = 0
if tokens >= 1 then
  tokens = tokens - 1
  allowed = 1
end

redis.call("HSET", key, "tokens", tostring(tokens), "last_refill", tostring(now))
redis.call("PEXPIRE", key, ttl)

return { allowed, tostring(tokens) }
"#;

/// 固定窗口计数：窗口内第一次自增时设置过期，返回 {计数, 剩余毫秒}
const WINDOW_HIT_LUA: &str = r#"
local hits = redis.call("INCR", KEYS[1])
local ttl = redis.call("PTTL", KEYS[1])
if ttl <= 0 then
  redis.call("PEXPIRE", KEYS[1], tonumber(ARGV[1]))
  ttl = tonumber(ARGV[1])
end
return { hits, ttl }
"#;

/// 只在窗口还存在时撤销计数，避免 DECR 凭空创建一个没有过期时间的键
const WINDOW_RELEASE_LUA: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 1 then
  return redis.call("DECR", KEYS[1])
end
return 0
"#;

/// Redis 存储，所有调用共用一个自动重连的多路复用连接
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    token_bucket: Arc<Script>,
    window_hit: Arc<Script>,
    window_release: Arc<Script>,
}

impl RedisStore {
    pub async fn connect(client: RedisClient) -> StoreResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            token_bucket: Arc::new(Script::new(TOKEN_BUCKET_LUA)),
            window_hit: Arc::new(Script::new(WINDOW_HIT_LUA)),
            window_release: Arc::new(Script::new(WINDOW_RELEASE_LUA)),
        })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn();
        Ok(conn.del(keys).await?)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        Ok(conn.keys(pattern).await?)
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn();
        Ok(conn.hgetall(key).await?)
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Duration,
    ) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(key, fields)
            .ignore()
            .pexpire(key, ttl.as_millis() as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
        ttl: Duration,
    ) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = redis::pipe()
            .atomic()
            .lrem(key, 0, value)
            .ignore()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, max_len as isize - 1)
            .ignore()
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, max_len: usize) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        Ok(conn.lrange(key, 0, max_len as isize - 1).await?)
    }

    async fn token_bucket(
        &self,
        key: &str,
        capacity: f64,
        refill_per_sec: f64,
        now_ms: i64,
        ttl: Duration,
    ) -> StoreResult<BucketReply> {
        let mut conn = self.conn();
        let (allowed, tokens): (i64, String) = self
            .token_bucket
            .key(key)
            .arg(capacity)
            .arg(refill_per_sec)
            .arg(now_ms)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;

        let tokens = tokens
            .parse::<f64>()
            .map_err(|e| StoreError::Protocol(format!("token count {:?}: {}", tokens, e)))?;

        Ok(BucketReply {
            allowed: allowed == 1,
            tokens,
        })
    }

    async fn window_hit(&self, key: &str, window: Duration) -> StoreResult<WindowReply> {
        let mut conn = self.conn();
        let (count, ttl_ms): (i64, i64) = self
            .window_hit
            .key(key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowReply {
            count: count.max(0) as u64,
            ttl_ms: ttl_ms.max(0) as u64,
        })
    }

    async fn window_release(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: i64 = self.window_release.key(key).invoke_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 需要本地 Redis，未设置 REDIS_URL 时跳过
    async fn store() -> Option<RedisStore> {
        let url = std::env::var("REDIS_URL").ok()?;
        let client = RedisClient::open(url).ok()?;
        RedisStore::connect(client).await.ok()
    }

    #[tokio::test]
    async fn calls_share_one_connection() {
        let Some(store) = store().await else { return };

        let first: i64 = redis::cmd("CLIENT")
            .arg("ID")
            .query_async(&mut store.conn())
            .await
            .unwrap();
        store.get("admission:test:missing").await.unwrap();
        let second: i64 = redis::cmd("CLIENT")
            .arg("ID")
            .query_async(&mut store.conn())
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn window_release_ignores_missing_window() {
        let Some(store) = store().await else { return };
        let key = format!("admission:test:window:{}", uuid::Uuid::new_v4());

        store.window_release(&key).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), None);

        let reply = store.window_hit(&key, Duration::from_secs(5)).await.unwrap();
        assert_eq!(reply.count, 1);
        store.del(&[key]).await.unwrap();
    }
}
