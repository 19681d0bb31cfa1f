mod auth;
mod error_handler;
mod rate_limit;
mod token_bucket;

pub use auth::{JwtSecret, auth_middleware};
pub use error_handler::log_errors;
pub use rate_limit::{LimiterChain, enforce_window_chain};
pub use token_bucket::{TokenBucketStage, enforce_token_bucket};
