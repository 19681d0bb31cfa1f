use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, RawPathParams, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, RateLimitRejection};
use crate::limiter::{QuotaSnapshot, RateLimitKey, RequestContext, WindowLimiter, WindowRule};
use crate::store::{FailOpen, KvStore};

/// 读取请求体做限流键时的大小上限
const MAX_KEY_BODY_BYTES: usize = 64 * 1024;

/// 按顺序执行的固定窗口限流链，任何一个拒绝即返回 429
#[derive(Clone)]
pub struct LimiterChain {
    limiters: Arc<Vec<WindowLimiter>>,
    trust_proxy: bool,
}

impl LimiterChain {
    pub fn new(limiters: Vec<WindowLimiter>) -> Self {
        Self {
            limiters: Arc::new(limiters),
            trust_proxy: false,
        }
    }

    /// 按代理头识别客户端地址，只在反向代理之后使用
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// 用同一个存储和容错策略构建整条链
    pub fn from_rules(rules: Vec<WindowRule>, store: Arc<dyn KvStore>, policy: FailOpen) -> Self {
        Self::new(
            rules
                .into_iter()
                .map(|rule| WindowLimiter::new(rule, store.clone(), policy))
                .collect(),
        )
    }

    fn needs_body(&self) -> bool {
        self.limiters.iter().any(|l| l.rule().key.needs_body())
    }
}

pub async fn enforce_window_chain(
    State(chain): State<LimiterChain>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let params: HashMap<String, String> = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let mut ctx = RequestContext::from_parts(&parts, params, chain.trust_proxy);

    // 需要读请求体的键策略会消费 body，读完后重新装回去
    let body = if chain.needs_body() {
        let bytes = match to_bytes(body, MAX_KEY_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return AppError::BadRequest("Request body too large".into()).into_response();
            }
        };
        ctx.body = serde_json::from_slice(&bytes).ok();
        Body::from(bytes)
    } else {
        body
    };

    let mut admitted: Vec<(&WindowLimiter, RateLimitKey, Option<QuotaSnapshot>)> =
        Vec::with_capacity(chain.limiters.len());

    for limiter in chain.limiters.iter() {
        let rule = limiter.rule();
        let key = rule.key.derive(rule.feature, &ctx);
        let decision = limiter.hit(&key).await;

        if !decision.allowed {
            // 前面已经计数的限流器不回滚
            tracing::info!("Rate limit exceeded for {}", key);
            return RateLimitRejection {
                message: rule.message.clone(),
                retry_after: decision.quota.map(|q| q.reset_secs),
                quota: decision.quota,
            }
            .into_response();
        }

        admitted.push((limiter, key, decision.quota));
    }

    let mut response = next.run(Request::from_parts(parts, body)).await;
    let succeeded = response.status().as_u16() < 400;

    let mut tightest: Option<QuotaSnapshot> = None;
    for (limiter, key, quota) in admitted {
        let released = succeeded && limiter.rule().skip_successful_requests;
        if released {
            limiter.release(&key).await;
        }

        // 头部反映撤销之后的剩余额度
        let Some(mut quota) = quota else { continue };
        if released {
            quota.remaining = (quota.remaining + 1).min(quota.limit);
        }
        if tightest.is_none_or(|t| quota.remaining < t.remaining) {
            tightest = Some(quota);
        }
    }

    if let Some(quota) = tightest {
        quota.write_headers(response.headers_mut());
    }

    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::limiter::KeyStrategy;
    use crate::limiter::rules;
    use crate::store::MemoryStore;
    use crate::store::testing::DownStore;
    use axum::{
        Json, Router,
        extract::ConnectInfo,
        http::{StatusCode, header},
        routing::post,
    };
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Arc::new(ManualClock::new(0))))
    }

    fn login_app(store: Arc<MemoryStore>) -> Router {
        let chain = LimiterChain::from_rules(
            vec![rules::login_ip(), rules::login_user()],
            store,
            FailOpen::default(),
        );
        Router::new()
            .route(
                "/login",
                post(|Json(body): Json<serde_json::Value>| async move {
                    if body["password"] == "right" {
                        StatusCode::OK
                    } else {
                        StatusCode::UNAUTHORIZED
                    }
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                chain,
                enforce_window_chain,
            ))
    }

    fn peer(addr: &str) -> ConnectInfo<SocketAddr> {
        ConnectInfo(addr.parse().unwrap())
    }

    fn login(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .extension(peer("10.0.0.1:5000"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn failed_logins_consume_quota_until_rejected() {
        let store = store();
        let app = login_app(store.clone());

        for _ in 0..5 {
            let response = app.clone().oneshot(login("alice", "wrong")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app.clone().oneshot(login("alice", "wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(response.headers()["ratelimit-remaining"], "0");

        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Too many login attempts. Please try again later."
        );
        assert_eq!(body["retryAfter"], 600);
    }

    #[tokio::test]
    async fn successful_logins_do_not_consume_quota() {
        let app = login_app(store());

        for _ in 0..10 {
            let response = app.clone().oneshot(login("alice", "right")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("ratelimit-limit"));
        }
    }

    #[tokio::test]
    async fn released_quota_is_reflected_in_headers() {
        let app = login_app(store());

        let response = app.clone().oneshot(login("alice", "right")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-remaining"], "5");

        let response = app.clone().oneshot(login("alice", "wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["ratelimit-remaining"], "4");
    }

    fn signup_app(trust_proxy: bool) -> Router {
        let chain = LimiterChain::from_rules(vec![rules::signup_ip()], store(), FailOpen::default())
            .trust_proxy_headers(trust_proxy);
        Router::new()
            .route("/signup", post(|| async { StatusCode::CREATED }))
            .route_layer(axum::middleware::from_fn_with_state(
                chain,
                enforce_window_chain,
            ))
    }

    fn signup_from(real_ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/signup")
            .extension(peer("198.51.100.7:40000"))
            .header("x-real-ip", real_ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn rotating_real_ip_header_shares_peer_quota() {
        let app = signup_app(false);

        let mut admitted = 0;
        for i in 0..20 {
            let response = app
                .clone()
                .oneshot(signup_from(&format!("10.9.9.{}", i)))
                .await
                .unwrap();
            if response.status() == StatusCode::CREATED {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }

    #[tokio::test]
    async fn trusted_proxy_keys_on_forwarded_address() {
        let app = signup_app(true);

        for i in 0..8 {
            let response = app
                .clone()
                .oneshot(signup_from(&format!("10.9.9.{}", i)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn body_is_still_readable_by_handler() {
        let app = login_app(store());
        let response = app.oneshot(login("Bob", "right")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn per_post_limit_uses_path_param() {
        let chain = LimiterChain::from_rules(
            vec![WindowRule {
                feature: "like",
                window: Duration::from_secs(60),
                max: 1,
                key: KeyStrategy::IdentityAndParam {
                    scope: "post",
                    param: "post_id",
                },
                skip_successful_requests: false,
                message: "slow".into(),
            }],
            store(),
            FailOpen::default(),
        );
        let app = Router::new()
            .route("/likes/{post_id}", post(|| async { StatusCode::OK }))
            .route_layer(axum::middleware::from_fn_with_state(
                chain,
                enforce_window_chain,
            ));
        let like = |post: &str| {
            Request::builder()
                .method("POST")
                .uri(format!("/likes/{}", post))
                .extension(peer("10.0.0.1:5000"))
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(app.clone().oneshot(like("1")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(like("2")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.clone().oneshot(like("1")).await.unwrap().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn chain_fails_open_when_store_is_down() {
        let chain = LimiterChain::from_rules(
            vec![rules::signup_ip(), rules::signup_user()],
            Arc::new(DownStore),
            FailOpen::default(),
        );
        let app = Router::new()
            .route("/login", post(|| async { StatusCode::CREATED }))
            .route_layer(axum::middleware::from_fn_with_state(
                chain,
                enforce_window_chain,
            ));

        for _ in 0..10 {
            let response = app.clone().oneshot(login("alice", "x")).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            assert!(!response.headers().contains_key("ratelimit-limit"));
        }
    }
}
