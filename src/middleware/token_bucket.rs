use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::RateLimitRejection;
use crate::limiter::{BucketRule, KeyStrategy, RequestContext, TokenBucketLimiter};

/// 令牌桶限流阶段，按用户（未登录按 IP）分桶
#[derive(Clone)]
pub struct TokenBucketStage {
    limiter: Arc<TokenBucketLimiter>,
    rule: BucketRule,
    trust_proxy: bool,
}

impl TokenBucketStage {
    pub fn new(limiter: Arc<TokenBucketLimiter>, rule: BucketRule) -> Self {
        Self {
            limiter,
            rule,
            trust_proxy: false,
        }
    }

    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}

pub async fn enforce_token_bucket(
    State(stage): State<TokenBucketStage>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let ctx = RequestContext::from_parts(&parts, HashMap::new(), stage.trust_proxy);
    let key = KeyStrategy::IdentityOrIp
        .derive(stage.rule.feature, &ctx)
        .bucket();

    let outcome = stage
        .limiter
        .try_consume(&key, stage.rule.capacity, stage.rule.refill_per_sec)
        .await;

    if !outcome.allowed {
        tracing::info!("Token bucket exhausted for {}", key);
        return RateLimitRejection {
            message: "Please slow down.".into(),
            retry_after: None,
            quota: None,
        }
        .into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{FailOpen, MemoryStore};
    use axum::{Router, extract::ConnectInfo, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn app(clock: Arc<ManualClock>) -> Router {
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let limiter = Arc::new(TokenBucketLimiter::new(
            store,
            clock,
            FailOpen::default(),
            Duration::from_secs(60),
        ));
        let stage = TokenBucketStage::new(
            limiter,
            BucketRule {
                feature: "feed",
                capacity: 2.0,
                refill_per_sec: 1.0,
            },
        );
        Router::new()
            .route("/feed", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(
                stage,
                enforce_token_bucket,
            ))
    }

    fn feed(ip: &str) -> Request<Body> {
        let addr: SocketAddr = format!("{}:5000", ip).parse().unwrap();
        Request::builder()
            .uri("/feed")
            .extension(ConnectInfo(addr))
            .header("x-forwarded-for", "10.0.0.254")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn burst_is_capped_then_refills() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let app = app(clock.clone());

        assert_eq!(app.clone().oneshot(feed("1.1.1.1")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(feed("1.1.1.1")).await.unwrap().status(), StatusCode::OK);

        let rejected = app.clone().oneshot(feed("1.1.1.1")).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(rejected.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Please slow down.");

        // 其他客户端不受影响
        assert_eq!(app.clone().oneshot(feed("2.2.2.2")).await.unwrap().status(), StatusCode::OK);

        clock.advance(Duration::from_secs(1));
        assert_eq!(app.clone().oneshot(feed("1.1.1.1")).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_header_does_not_open_new_bucket() {
        let app = app(Arc::new(ManualClock::new(1_700_000_000_000)));
        let spoofed = |ip: &str| {
            Request::builder()
                .uri("/feed")
                .extension(ConnectInfo("198.51.100.7:5000".parse::<SocketAddr>().unwrap()))
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(app.clone().oneshot(spoofed("10.0.0.1")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(spoofed("10.0.0.2")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.clone().oneshot(spoofed("10.0.0.3")).await.unwrap().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
