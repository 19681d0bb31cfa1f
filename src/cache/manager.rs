use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::keys::{CacheKey, KeyPrefix, decode_segment};
use super::models::CachePayload;
use crate::config::ConfigError;
use crate::store::{FailOpen, KvStore};

/// 一个缓存命名空间：键前缀和两档过期时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheNamespace {
    prefix: &'static str,
    default_ttl: Duration,
    empty_ttl: Duration,
}

impl CacheNamespace {
    /// 空结果的过期时间必须短于普通结果
    pub fn new(
        prefix: &'static str,
        default_ttl: Duration,
        empty_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        if empty_ttl.is_zero() || empty_ttl >= default_ttl {
            return Err(ConfigError::InvalidTtl {
                namespace: prefix,
                default_ttl,
                empty_ttl,
            });
        }
        Ok(Self {
            prefix,
            default_ttl,
            empty_ttl,
        })
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn empty_ttl(&self) -> Duration {
        self.empty_ttl
    }
}

/// 命名空间下的缓存统计，仅用于诊断
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub namespace: &'static str,
    pub total_keys: usize,
    pub unique_owners: usize,
    pub per_owner: BTreeMap<String, usize>,
}

/// 通用缓存管理：读、写、失效、统计。
/// 所有存储错误都在这里吞掉：读失败等于未命中，写失败返回 false，失效失败返回 0。
pub struct CacheManager {
    store: Arc<dyn KvStore>,
    namespace: CacheNamespace,
    policy: FailOpen,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>, namespace: CacheNamespace, policy: FailOpen) -> Self {
        Self {
            store,
            namespace,
            policy,
        }
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self
            .policy
            .or("cache_get", key.as_str(), self.store.get(key.as_str()), None)
            .await;

        let Some(raw) = raw else {
            tracing::debug!("Cache miss: {}", key);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                // 按未命中处理，调用方会回源并覆盖这条记录
                tracing::warn!("Malformed cached payload at {}: {}", key, e);
                None
            }
        }
    }

    /// 写入缓存。未指定 ttl 时按内容是否为空选择过期时间。
    pub async fn put<T>(&self, key: &CacheKey, payload: &T, ttl: Option<Duration>) -> bool
    where
        T: Serialize + CachePayload,
    {
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(payload));

        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize payload for {}: {}", key, e);
                return false;
            }
        };

        let stored = self
            .policy
            .guard(
                "cache_put",
                key.as_str(),
                self.store.set_ex(key.as_str(), &json, ttl),
            )
            .await
            .is_ok();

        if stored {
            tracing::debug!("Cached {} (TTL: {}s)", key, ttl.as_secs());
        }
        stored
    }

    pub fn ttl_for<T: CachePayload>(&self, payload: &T) -> Duration {
        if payload.is_empty_result() {
            self.namespace.empty_ttl
        } else {
            self.namespace.default_ttl
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) -> u64 {
        self.policy
            .or(
                "cache_invalidate",
                key.as_str(),
                self.store.del(&[key.as_str().to_string()]),
                0,
            )
            .await
    }

    /// 先枚举再批量删除，两步之间被并发读者回填的条目会存活到自身过期
    pub async fn invalidate_by_prefix(&self, prefix: &KeyPrefix) -> u64 {
        let pattern = prefix.pattern();
        let keys = match self
            .policy
            .guard("cache_scan", &pattern, self.store.keys(&pattern))
            .await
        {
            Ok(keys) => keys,
            Err(_) => return 0,
        };

        if keys.is_empty() {
            return 0;
        }

        let deleted = self
            .policy
            .or("cache_invalidate", &pattern, self.store.del(&keys), 0)
            .await;
        tracing::debug!("Invalidated {} cache entries under {}", deleted, prefix.as_str());
        deleted
    }

    /// 清空整个命名空间
    pub async fn clear(&self) -> u64 {
        self.invalidate_by_prefix(&KeyPrefix::namespace(self.namespace.prefix))
            .await
    }

    /// 按所属实体分组统计
    pub async fn stats(&self) -> CacheStats {
        let root = KeyPrefix::namespace(self.namespace.prefix);
        let pattern = root.pattern();
        let keys = self
            .policy
            .or("cache_stats", &pattern, self.store.keys(&pattern), Vec::new())
            .await;

        let mut per_owner = BTreeMap::new();
        for key in &keys {
            if let Some(owner) = key
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.split(':').next())
                .filter(|owner| !owner.is_empty())
            {
                *per_owner.entry(decode_segment(owner)).or_insert(0) += 1;
            }
        }

        CacheStats {
            namespace: self.namespace.prefix,
            total_keys: keys.len(),
            unique_owners: per_owner.len(),
            per_owner,
        }
    }
}
