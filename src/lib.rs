use std::sync::Arc;

use cache::{
    CacheManager, FeedCacheOperations, InvalidationCoordinator, JobCacheOperations,
    ProfileCacheOperations, RelationshipSource, SearchCacheOperations,
};
use clock::SharedClock;
use config::{Config, ConfigError};
use limiter::TokenBucketLimiter;
use sqlx::PgPool;
use store::{FailOpen, KvStore};

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod result;
pub mod router;
pub mod store;
pub mod utils;

pub mod routes;

/// 应用状态：限流器和缓存都在这里创建一次，通过 Arc 共享
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<dyn KvStore>,
    pub policy: FailOpen,
    pub token_buckets: Arc<TokenBucketLimiter>,
    pub feed_cache: Arc<FeedCacheOperations>,
    pub profile_cache: Arc<ProfileCacheOperations>,
    pub job_cache: Arc<JobCacheOperations>,
    pub search_cache: Arc<SearchCacheOperations>,
    pub invalidation: Arc<InvalidationCoordinator>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: Config,
        store: Arc<dyn KvStore>,
        clock: SharedClock,
        relationships: Arc<dyn RelationshipSource>,
    ) -> Result<Self, ConfigError> {
        let policy = FailOpen::new(config.store_timeout());
        let manager = |namespace| Arc::new(CacheManager::new(store.clone(), namespace, policy));

        let feed_cache = Arc::new(FeedCacheOperations::new(manager(config.feed_namespace()?)));
        let profile_cache = Arc::new(ProfileCacheOperations::new(manager(
            config.profile_namespace()?,
        )));
        let job_cache = Arc::new(JobCacheOperations::new(manager(config.job_namespace()?)));
        let search_cache = Arc::new(SearchCacheOperations::new(
            manager(config.search_namespace()?),
            store.clone(),
            policy,
        ));
        let invalidation = Arc::new(InvalidationCoordinator::new(
            feed_cache.clone(),
            relationships,
        ));
        let token_buckets = Arc::new(TokenBucketLimiter::new(
            store.clone(),
            clock,
            policy,
            config.token_bucket_ttl(),
        ));

        Ok(Self {
            pool,
            config: Arc::new(config),
            store,
            policy,
            token_buckets,
            feed_cache,
            profile_cache,
            job_cache,
            search_cache,
            invalidation,
        })
    }
}
