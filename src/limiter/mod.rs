// 限流模块
// 令牌桶用于平滑的读接口限流，固定窗口用于登录、注册、点赞等防滥用限流

pub mod keys;
pub mod rules;
pub mod token_bucket;
pub mod window;

pub use keys::{KeyStrategy, RateLimitKey, RequestContext};
pub use rules::BucketRule;
pub use token_bucket::{TokenBucketLimiter, TokenBucketOutcome, TokenBucketState};
pub use window::{QuotaSnapshot, WindowDecision, WindowLimiter, WindowRule};
