use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

use super::StoreResult;

/// 统一的存储容错策略：每次存储调用都带超时，失败时记录日志并放行
#[derive(Debug, Clone, Copy)]
pub struct FailOpen {
    timeout: Duration,
}

impl FailOpen {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行存储调用，超时转换为 `StoreError::Timeout`，错误已记录日志
    pub async fn guard<T, F>(&self, op: &'static str, key: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        if let Err(e) = &result {
            tracing::warn!(op, key, error = %e, "Store call failed, failing open");
        }

        result
    }

    /// 执行存储调用，失败时返回 fallback
    pub async fn or<T, F>(&self, op: &'static str, key: &str, fut: F, fallback: T) -> T
    where
        F: Future<Output = StoreResult<T>>,
    {
        self.guard(op, key, fut).await.unwrap_or(fallback)
    }
}

impl Default for FailOpen {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_success() {
        let policy = FailOpen::default();
        let value = policy.or("get", "k", async { Ok(7) }, 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn store_error_yields_fallback() {
        let policy = FailOpen::default();
        let value = policy
            .or(
                "get",
                "k",
                async { Err::<i32, _>(StoreError::Unavailable("down".into())) },
                -1,
            )
            .await;
        assert_eq!(value, -1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_times_out() {
        let policy = FailOpen::new(Duration::from_millis(50));
        let result = policy
            .guard("get", "k", std::future::pending::<StoreResult<()>>())
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_millis(50)));
    }
}
