use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{BucketReply, KvStore, StoreResult, WindowReply};
use crate::clock::SharedClock;
use crate::error::StoreError;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<i64>,
}

/// 进程内存储，没有配置 Redis 时使用。
/// 所有操作在同一把锁内完成，等价于 Redis 单线程执行脚本。
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: SharedClock,
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> StoreResult<(MutexGuard<'_, HashMap<String, Entry>>, i64)> {
        let now = self.clock.now_ms();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        entries.retain(|_, e| e.expires_at.is_none_or(|at| at > now));
        Ok((entries, now))
    }

    /// 剩余存活毫秒数，测试中用来比较过期时间
    pub fn ttl_ms(&self, key: &str) -> Option<i64> {
        let (entries, now) = self.lock().ok()?;
        entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at - now)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Protocol(format!("WRONGTYPE operation against key {}", key))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let (entries, _) = self.lock()?;
        match entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let (mut entries, now) = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(now + ttl.as_millis() as i64),
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let (mut entries, _) = self.lock()?;
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count() as u64)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let (entries, _) = self.lock()?;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let (entries, _) = self.lock()?;
        match entries.get(key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(h)) => Ok(h.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Duration,
    ) -> StoreResult<()> {
        let (mut entries, now) = self.lock()?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        let Value::Hash(hash) = &mut entry.value else {
            return Err(wrong_type(key));
        };
        for (field, value) in fields {
            hash.insert(field.to_string(), value.clone());
        }
        entry.expires_at = Some(now + ttl.as_millis() as i64);
        Ok(())
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
        ttl: Duration,
    ) -> StoreResult<()> {
        let (mut entries, now) = self.lock()?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        let Value::List(list) = &mut entry.value else {
            return Err(wrong_type(key));
        };
        list.retain(|v| v != value);
        list.push_front(value.to_string());
        list.truncate(max_len);
        entry.expires_at = Some(now + ttl.as_millis() as i64);
        Ok(())
    }

    async fn list_range(&self, key: &str, max_len: usize) -> StoreResult<Vec<String>> {
        let (entries, _) = self.lock()?;
        match entries.get(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.iter().take(max_len).cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn token_bucket(
        &self,
        key: &str,
        capacity: f64,
        refill_per_sec: f64,
        now_ms: i64,
        ttl: Duration,
    ) -> StoreResult<BucketReply> {
        let (mut entries, now) = self.lock()?;

        let stored = match entries.get(key).map(|e| &e.value) {
            None => None,
            Some(Value::Hash(h)) => {
                let tokens = h.get("tokens").and_then(|v| v.parse::<f64>().ok());
                let last = h.get("last_refill").and_then(|v| v.parse::<i64>().ok());
                tokens.zip(last)
            }
            Some(_) => return Err(wrong_type(key)),
        };
        let (tokens, last_refill) = stored.unwrap_or((capacity, now_ms));

        let elapsed = (now_ms - last_refill).max(0) as f64 / 1000.0;
        let mut tokens = capacity.min(tokens + elapsed * refill_per_sec);

        let allowed = tokens >= 1.0;
        if allowed {
            tokens -= 1.0;
        }

        let mut hash = HashMap::new();
        hash.insert("tokens".to_string(), tokens.to_string());
        hash.insert("last_refill".to_string(), now_ms.to_string());
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Hash(hash),
                expires_at: Some(now + ttl.as_millis() as i64),
            },
        );

        Ok(BucketReply { allowed, tokens })
    }

    async fn window_hit(&self, key: &str, window: Duration) -> StoreResult<WindowReply> {
        let (mut entries, now) = self.lock()?;
        let window_ms = window.as_millis() as i64;

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Str("0".into()),
            expires_at: None,
        });
        let Value::Str(raw) = &mut entry.value else {
            return Err(wrong_type(key));
        };
        let count = raw
            .parse::<i64>()
            .map_err(|_| StoreError::Protocol(format!("value at {} is not an integer", key)))?
            + 1;
        *raw = count.to_string();

        let expires_at = *entry.expires_at.get_or_insert(now + window_ms);

        Ok(WindowReply {
            count: count.max(0) as u64,
            ttl_ms: (expires_at - now).max(0) as u64,
        })
    }

    async fn window_release(&self, key: &str) -> StoreResult<()> {
        let (mut entries, _) = self.lock()?;
        if let Some(entry) = entries.get_mut(key) {
            let Value::Str(raw) = &mut entry.value else {
                return Err(wrong_type(key));
            };
            if let Ok(count) = raw.parse::<i64>() {
                *raw = (count - 1).to_string();
            }
        }
        Ok(())
    }
}

/// Redis 风格的 glob 匹配，支持 `*`、`?` 和反斜杠转义
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_from(&p, &t)
}

fn glob_from(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => (0..=t.len()).any(|i| glob_from(&p[1..], &t[i..])),
        Some('?') => !t.is_empty() && glob_from(&p[1..], &t[1..]),
        Some('\\') if p.len() > 1 => t.first() == Some(&p[1]) && glob_from(&p[2..], &t[1..]),
        Some(c) => t.first() == Some(c) && glob_from(&p[1..], &t[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn values_expire_after_ttl() {
        let (clock, store) = store();
        store
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance(Duration::from_secs(10));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_honours_pattern_and_escapes() {
        let (_, store) = store();
        let ttl = Duration::from_secs(60);
        store.set_ex("feed:connections:1:10:0", "a", ttl).await.unwrap();
        store.set_ex("feed:connections:1:10:10", "b", ttl).await.unwrap();
        store.set_ex("feed:connections:12:10:0", "c", ttl).await.unwrap();
        store.set_ex("feed:connections:a*b:10:0", "d", ttl).await.unwrap();

        let keys = store.keys("feed:connections:1:*").await.unwrap();
        assert_eq!(
            keys,
            vec!["feed:connections:1:10:0", "feed:connections:1:10:10"]
        );

        let keys = store.keys("feed:connections:a\\*b:*").await.unwrap();
        assert_eq!(keys, vec!["feed:connections:a*b:10:0"]);
    }

    #[tokio::test]
    async fn list_push_dedups_and_caps() {
        let (_, store) = store();
        let ttl = Duration::from_secs(60);
        for q in ["a", "b", "c", "a"] {
            store.list_push_capped("recent", q, 3, ttl).await.unwrap();
        }
        store.list_push_capped("recent", "d", 3, ttl).await.unwrap();

        let items = store.list_range("recent", 3).await.unwrap();
        assert_eq!(items, vec!["d", "a", "c"]);
    }

    #[tokio::test]
    async fn window_release_ignores_expired_window() {
        let (clock, store) = store();
        let window = Duration::from_secs(1);
        store.window_hit("w", window).await.unwrap();
        clock.advance(window);

        store.window_release("w").await.unwrap();
        assert_eq!(store.get("w").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_type_is_protocol_error() {
        let (_, store) = store();
        store
            .list_push_capped("l", "x", 5, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(store.get("l").await, Err(StoreError::Protocol(_))));
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("jobs:*", "jobs:1:10:0"));
        assert!(!glob_match("jobs:*", "job:1"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("a\\?c", "a?c"));
        assert!(!glob_match("a\\?c", "abc"));
    }
}
