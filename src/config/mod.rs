use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheNamespace;
use crate::cache::keys::feed_keys::FEED_PREFIX;
use crate::cache::keys::job_keys::JOB_PREFIX;
use crate::cache::keys::profile_keys::PROFILE_PREFIX;
use crate::cache::keys::search_keys::SEARCH_PREFIX;

/// 启动阶段的配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error(
        "cache namespace {namespace}: empty TTL {empty_ttl:?} must be shorter than default TTL {default_ttl:?}"
    )]
    InvalidTtl {
        namespace: &'static str,
        default_ttl: Duration,
        empty_ttl: Duration,
    },
}

/// 单个缓存命名空间的过期时间（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub default_secs: u64,
    pub empty_secs: u64,
}

impl CacheTtl {
    const fn new(default_secs: u64, empty_secs: u64) -> Self {
        Self {
            default_secs,
            empty_secs,
        }
    }

    fn from_env(self, default_var: &'static str, empty_var: &'static str) -> Result<Self, ConfigError> {
        Ok(Self {
            default_secs: parse_or(default_var, self.default_secs)?,
            empty_secs: parse_or(empty_var, self.empty_secs)?,
        })
    }

    pub fn namespace(&self, prefix: &'static str) -> Result<CacheNamespace, ConfigError> {
        CacheNamespace::new(
            prefix,
            Duration::from_secs(self.default_secs),
            Duration::from_secs(self.empty_secs),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// 未配置时使用进程内存储
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// 是否信任 x-real-ip / x-forwarded-for，只有部署在反向代理之后才打开
    pub trust_proxy_headers: bool,
    pub store_timeout_ms: u64,
    pub token_bucket_ttl_ms: u64,
    pub feed_cache: CacheTtl,
    pub profile_cache: CacheTtl,
    pub job_cache: CacheTtl,
    pub search_cache: CacheTtl,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_expiration = optional("JWT_EXPIRATION")
            .map(|v| v.trim_end_matches('h').to_string())
            .map(|v| {
                v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: "JWT_EXPIRATION",
                    value: v,
                })
            })
            .transpose()?
            .unwrap_or(24);

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: optional("REDIS_URL"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 3000)?,
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            trust_proxy_headers: parse_or("TRUST_PROXY_HEADERS", false)?,
            store_timeout_ms: parse_or("STORE_TIMEOUT_MS", 200)?,
            token_bucket_ttl_ms: parse_or("TOKEN_BUCKET_TTL_MS", 60_000)?,
            feed_cache: CacheTtl::new(900, 300).from_env("FEED_CACHE_TTL", "FEED_CACHE_EMPTY_TTL")?,
            profile_cache: CacheTtl::new(1800, 300)
                .from_env("PROFILE_CACHE_TTL", "PROFILE_CACHE_EMPTY_TTL")?,
            job_cache: CacheTtl::new(900, 300).from_env("JOB_CACHE_TTL", "JOB_CACHE_EMPTY_TTL")?,
            search_cache: CacheTtl::new(60, 15)
                .from_env("SEARCH_CACHE_TTL", "SEARCH_CACHE_EMPTY_TTL")?,
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn token_bucket_ttl(&self) -> Duration {
        Duration::from_millis(self.token_bucket_ttl_ms)
    }

    pub fn feed_namespace(&self) -> Result<CacheNamespace, ConfigError> {
        self.feed_cache.namespace(FEED_PREFIX)
    }

    pub fn profile_namespace(&self) -> Result<CacheNamespace, ConfigError> {
        self.profile_cache.namespace(PROFILE_PREFIX)
    }

    pub fn job_namespace(&self) -> Result<CacheNamespace, ConfigError> {
        self.job_cache.namespace(JOB_PREFIX)
    }

    pub fn search_namespace(&self) -> Result<CacheNamespace, ConfigError> {
        self.search_cache.namespace(SEARCH_PREFIX)
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
