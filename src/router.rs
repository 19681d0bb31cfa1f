use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower::ServiceBuilder;

use crate::{
    AppState,
    limiter::rules::{self, FEED_BUCKET, PROFILE_BUCKET},
    middleware::{
        JwtSecret, LimiterChain, TokenBucketStage, auth_middleware, enforce_token_bucket,
        enforce_window_chain, log_errors,
    },
    routes,
};

// 登录相关路由，只做固定窗口限流
fn auth_routes(state: &AppState) -> Router<AppState> {
    let trust = state.config.trust_proxy_headers;
    let chain = |list| {
        LimiterChain::from_rules(list, state.store.clone(), state.policy).trust_proxy_headers(trust)
    };

    Router::new()
        .route(
            "/auth/login",
            post(routes::auth::login).route_layer(from_fn_with_state(
                chain(vec![rules::login_ip(), rules::login_user()]),
                enforce_window_chain,
            )),
        )
        .route(
            "/auth/signup",
            post(routes::auth::signup).route_layer(from_fn_with_state(
                chain(vec![rules::signup_ip(), rules::signup_user()]),
                enforce_window_chain,
            )),
        )
}

// 需要认证的路由。限流层在认证之后执行，才能按用户计数
fn protected_routes(state: &AppState) -> Router<AppState> {
    let trust = state.config.trust_proxy_headers;
    let chain = |list| {
        LimiterChain::from_rules(list, state.store.clone(), state.policy).trust_proxy_headers(trust)
    };
    let bucket = |rule| {
        TokenBucketStage::new(state.token_buckets.clone(), rule).trust_proxy_headers(trust)
    };
    let feed_bucket = bucket(FEED_BUCKET);
    let profile_bucket = bucket(PROFILE_BUCKET);

    let feed = Router::new()
        .route("/feed", get(routes::feed::get_feed))
        .route_layer(from_fn_with_state(feed_bucket, enforce_token_bucket));

    let profile = Router::new()
        .route("/profile/{id}", get(routes::profile::get_profile))
        .route("/profile/{id}/about", get(routes::profile::get_about))
        .route("/profile/{id}/education", get(routes::profile::get_education))
        .route("/profile/{id}/work", get(routes::profile::get_work))
        .route("/profile/{id}/brand-posts", get(routes::profile::get_brand_posts))
        .route_layer(from_fn_with_state(profile_bucket, enforce_token_bucket));

    Router::new()
        .merge(feed)
        .merge(profile)
        .route(
            "/auth/logout",
            post(routes::auth::logout).route_layer(from_fn_with_state(
                chain(vec![rules::logout()]),
                enforce_window_chain,
            )),
        )
        .route(
            "/likes/{post_id}",
            post(routes::like::like_post).route_layer(from_fn_with_state(
                chain(vec![rules::like_user(), rules::like_ip(), rules::like_post()]),
                enforce_window_chain,
            )),
        )
        .route("/profile/about", put(routes::profile::put_about))
        .route(
            "/jobs",
            get(routes::job::list_jobs).post(routes::job::post_job),
        )
        .route("/search", get(routes::search::search))
        .route(
            "/search/recent",
            get(routes::search::recent_searches).delete(routes::search::clear_recent_searches),
        )
        .route("/posts", post(routes::post::create_post))
        .route("/posts/{id}", put(routes::post::update_post))
        .route(
            "/connections/{id}",
            post(routes::connection::add_connection)
                .delete(routes::connection::remove_connection),
        )
        .route("/admin/cache/stats", get(routes::admin::cache_stats))
        .route_layer(from_fn_with_state(
            JwtSecret::new(&state.config.jwt_secret),
            auth_middleware,
        ))
}

/// 组装完整的应用路由
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_routes(&state))
        .merge(protected_routes(&state));

    // axum 不允许嵌套在根路径上
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    router
        .layer(ServiceBuilder::new().layer(from_fn(log_errors)))
        .with_state(state)
}
