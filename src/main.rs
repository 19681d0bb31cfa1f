use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use admission::{
    AppState,
    clock::SystemClock,
    config::Config,
    router::build_router,
    routes::connection::PgRelationshipSource,
    store::{KvStore, MemoryStore, RedisStore},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'admission';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 没有配置 Redis 时退回进程内存储，只适合单实例
    let clock = Arc::new(SystemClock);
    let store: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).expect("Failed to create Redis client");
            let store = RedisStore::connect(client)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory store");
            Arc::new(MemoryStore::new(clock.clone()))
        }
    };

    let relationships = Arc::new(PgRelationshipSource::new(pool.clone()));
    let state = AppState::new(pool, config, store, clock, relationships)
        .expect("Invalid cache configuration");

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );

    let router = build_router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    #[cfg(not(debug_assertions))]
    let router = router.layer(CorsLayer::new());

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
