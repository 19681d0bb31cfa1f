use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::keys::{KeyStrategy, RateLimitKey};
use crate::store::{FailOpen, KvStore};

/// 一个固定窗口限流器的配置
#[derive(Debug, Clone)]
pub struct WindowRule {
    /// 键的第一段，例如 `login`
    pub feature: &'static str,
    pub window: Duration,
    pub max: u64,
    pub key: KeyStrategy,
    /// 为 true 时成功的请求不占用配额
    pub skip_successful_requests: bool,
    pub message: String,
}

/// 返回给客户端的配额信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub limit: u64,
    pub remaining: u64,
    pub reset_secs: u64,
}

impl QuotaSnapshot {
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(
            HeaderName::from_static("ratelimit-limit"),
            HeaderValue::from(self.limit),
        );
        headers.insert(
            HeaderName::from_static("ratelimit-remaining"),
            HeaderValue::from(self.remaining),
        );
        headers.insert(
            HeaderName::from_static("ratelimit-reset"),
            HeaderValue::from(self.reset_secs),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub allowed: bool,
    /// 本窗口内的计数；存储不可用时为 None
    pub count: Option<u64>,
    pub quota: Option<QuotaSnapshot>,
}

/// 固定窗口计数限流器
pub struct WindowLimiter {
    rule: WindowRule,
    store: Arc<dyn KvStore>,
    policy: FailOpen,
}

impl WindowLimiter {
    pub fn new(rule: WindowRule, store: Arc<dyn KvStore>, policy: FailOpen) -> Self {
        Self {
            rule,
            store,
            policy,
        }
    }

    pub fn rule(&self) -> &WindowRule {
        &self.rule
    }

    /// 计数加一并判断是否超限。计数在判断前就已经发生，被拒绝的请求也计入。
    pub async fn hit(&self, key: &RateLimitKey) -> WindowDecision {
        let reply = self
            .policy
            .guard(
                "window_hit",
                key.as_str(),
                self.store.window_hit(key.as_str(), self.rule.window),
            )
            .await;

        match reply {
            Ok(reply) => WindowDecision {
                allowed: reply.count <= self.rule.max,
                count: Some(reply.count),
                quota: Some(QuotaSnapshot {
                    limit: self.rule.max,
                    remaining: self.rule.max.saturating_sub(reply.count),
                    reset_secs: reply.ttl_ms.div_ceil(1000),
                }),
            },
            Err(_) => WindowDecision {
                allowed: true,
                count: None,
                quota: None,
            },
        }
    }

    /// 撤销一次计数，用于成功请求不计数的场景
    pub async fn release(&self, key: &RateLimitKey) {
        self.policy
            .or(
                "window_release",
                key.as_str(),
                self.store.window_release(key.as_str()),
                (),
            )
            .await;
    }
}
