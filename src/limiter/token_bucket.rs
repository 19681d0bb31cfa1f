use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::keys::RateLimitKey;
use crate::clock::SharedClock;
use crate::store::{FailOpen, KvStore};

/// 桶的持久化状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenBucketState {
    pub tokens: f64,
    pub last_refill: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketOutcome {
    pub allowed: bool,
    pub tokens_remaining: f64,
}

/// 基于共享存储的原子令牌桶
pub struct TokenBucketLimiter {
    store: Arc<dyn KvStore>,
    clock: SharedClock,
    policy: FailOpen,
    /// 空闲桶的保底过期时间
    state_ttl: Duration,
}

impl TokenBucketLimiter {
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: SharedClock,
        policy: FailOpen,
        state_ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            state_ttl,
        }
    }

    /// 尝试取一个令牌。容量小于 1 直接拒绝；存储不可用时放行。
    pub async fn try_consume(
        &self,
        key: &RateLimitKey,
        capacity: f64,
        refill_per_sec: f64,
    ) -> TokenBucketOutcome {
        if capacity < 1.0 {
            return TokenBucketOutcome {
                allowed: false,
                tokens_remaining: 0.0,
            };
        }

        let now = self.clock.now_ms();
        let reply = self
            .policy
            .guard(
                "token_bucket",
                key.as_str(),
                self.store.token_bucket(
                    key.as_str(),
                    capacity,
                    refill_per_sec.max(0.0),
                    now,
                    self.state_ttl,
                ),
            )
            .await;

        match reply {
            Ok(reply) => {
                let tokens_remaining = reply.tokens.clamp(0.0, capacity);
                if !reply.allowed {
                    tracing::debug!(key = %key, tokens = tokens_remaining, "Token bucket empty");
                }
                TokenBucketOutcome {
                    allowed: reply.allowed,
                    tokens_remaining,
                }
            }
            Err(_) => TokenBucketOutcome {
                allowed: true,
                tokens_remaining: capacity,
            },
        }
    }

    /// 读取桶的当前状态（不补充、不扣减），仅用于诊断
    pub async fn inspect(&self, key: &RateLimitKey) -> Option<TokenBucketState> {
        let fields = self
            .policy
            .guard(
                "token_bucket_inspect",
                key.as_str(),
                self.store.hash_get_all(key.as_str()),
            )
            .await
            .ok()?;

        Some(TokenBucketState {
            tokens: fields.get("tokens")?.parse().ok()?,
            last_refill: fields.get("last_refill")?.parse().ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::MemoryStore;
    use crate::store::testing::{DownStore, HangingStore};

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        limiter: TokenBucketLimiter,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let limiter = TokenBucketLimiter::new(
            store.clone(),
            clock.clone(),
            FailOpen::default(),
            Duration::from_secs(60),
        );
        Fixture {
            clock,
            store,
            limiter,
        }
    }

    fn key(id: &str) -> RateLimitKey {
        RateLimitKey::new("feed").scope("user", id).bucket()
    }

    #[tokio::test]
    async fn fresh_bucket_allows_capacity_then_rejects() {
        let f = fixture();
        let k = key("1");

        let mut last = None;
        for _ in 0..5 {
            let outcome = f.limiter.try_consume(&k, 5.0, 0.0).await;
            assert!(outcome.allowed);
            last = Some(outcome);
        }
        assert_eq!(last.unwrap().tokens_remaining, 0.0);

        let sixth = f.limiter.try_consume(&k, 5.0, 0.0).await;
        assert!(!sixth.allowed);
    }

    #[tokio::test]
    async fn exhausted_bucket_refills_with_elapsed_time() {
        let f = fixture();
        let k = key("2");
        let now = f.clock.now_ms();
        f.store
            .hash_set(
                k.as_str(),
                &[("tokens", "0".to_string()), ("last_refill", now.to_string())],
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(!f.limiter.try_consume(&k, 5.0, 1.0).await.allowed);

        f.clock.advance(Duration::from_secs(2));
        let outcome = f.limiter.try_consume(&k, 5.0, 1.0).await;
        assert!(outcome.allowed);
        assert_eq!(outcome.tokens_remaining, 1.0);
    }

    #[tokio::test]
    async fn refill_accrues_fractional_tokens() {
        let f = fixture();
        let k = key("3");
        assert!(f.limiter.try_consume(&k, 1.0, 0.5).await.allowed);

        f.clock.advance(Duration::from_millis(1_000));
        let outcome = f.limiter.try_consume(&k, 1.0, 0.5).await;
        assert!(!outcome.allowed);
        assert_eq!(outcome.tokens_remaining, 0.5);

        f.clock.advance(Duration::from_millis(1_000));
        assert!(f.limiter.try_consume(&k, 1.0, 0.5).await.allowed);
    }

    #[tokio::test]
    async fn refill_never_exceeds_capacity() {
        let f = fixture();
        let k = key("4");
        f.limiter.try_consume(&k, 3.0, 10.0).await;
        f.clock.advance(Duration::from_secs(30));

        let outcome = f.limiter.try_consume(&k, 3.0, 10.0).await;
        assert_eq!(outcome.tokens_remaining, 2.0);
        let state = f.limiter.inspect(&k).await.unwrap();
        assert_eq!(state.tokens, 2.0);
        assert_eq!(state.last_refill, f.clock.now_ms());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_bucket() {
        let f = fixture();
        let limiter = Arc::new(f.limiter);
        let k = key("concurrent");

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let limiter = limiter.clone();
                let k = k.clone();
                tokio::spawn(async move { limiter.try_consume(&k, 10.0, 0.0).await.allowed })
            })
            .collect();

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    #[tokio::test]
    async fn capacity_below_one_always_rejects() {
        let f = fixture();
        let outcome = f.limiter.try_consume(&key("5"), 0.5, 100.0).await;
        assert!(!outcome.allowed);
        assert!(f.limiter.inspect(&key("5")).await.is_none());
    }

    #[tokio::test]
    async fn idle_bucket_state_expires() {
        let f = fixture();
        let k = key("6");
        f.limiter.try_consume(&k, 2.0, 0.0).await;
        assert!(f.limiter.inspect(&k).await.is_some());

        f.clock.advance(Duration::from_secs(61));
        assert!(f.limiter.inspect(&k).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_store_fails_open() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = TokenBucketLimiter::new(
            Arc::new(DownStore),
            clock,
            FailOpen::default(),
            Duration::from_secs(60),
        );
        assert!(limiter.try_consume(&key("7"), 1.0, 0.0).await.allowed);
        assert!(limiter.try_consume(&key("7"), 1.0, 0.0).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_fails_open() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = TokenBucketLimiter::new(
            Arc::new(HangingStore),
            clock,
            FailOpen::new(Duration::from_millis(100)),
            Duration::from_secs(60),
        );
        assert!(limiter.try_consume(&key("8"), 1.0, 0.0).await.allowed);
    }
}
