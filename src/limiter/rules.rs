// 线上使用的限流配置

use std::time::Duration;

use super::keys::KeyStrategy;
use super::window::WindowRule;

const MINUTE: u64 = 60;

/// 令牌桶阶段的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketRule {
    pub feature: &'static str,
    pub capacity: f64,
    pub refill_per_sec: f64,
}

pub const FEED_BUCKET: BucketRule = BucketRule {
    feature: "feed",
    capacity: 10.0,
    refill_per_sec: 0.5,
};

pub const PROFILE_BUCKET: BucketRule = BucketRule {
    feature: "profile",
    capacity: 15.0,
    refill_per_sec: 0.5,
};

fn rule(
    feature: &'static str,
    minutes: u64,
    max: u64,
    key: KeyStrategy,
    skip_successful_requests: bool,
    message: &str,
) -> WindowRule {
    WindowRule {
        feature,
        window: Duration::from_secs(minutes * MINUTE),
        max,
        key,
        skip_successful_requests,
        message: message.to_string(),
    }
}

pub fn login_ip() -> WindowRule {
    rule(
        "login",
        10,
        5,
        KeyStrategy::Ip,
        true,
        "Too many login attempts. Please try again later.",
    )
}

pub fn login_user() -> WindowRule {
    rule(
        "login",
        10,
        5,
        KeyStrategy::BodyField("username"),
        true,
        "Too many login attempts for this account.",
    )
}

pub fn logout() -> WindowRule {
    rule(
        "logout",
        5,
        10,
        KeyStrategy::IdentityOrIp,
        false,
        "Too many logout requests. Please slow down.",
    )
}

pub fn signup_ip() -> WindowRule {
    rule(
        "signup",
        15,
        5,
        KeyStrategy::Ip,
        false,
        "Too many signup attempts. Please try again later.",
    )
}

pub fn signup_user() -> WindowRule {
    rule(
        "signup",
        60,
        3,
        KeyStrategy::BodyField("username"),
        false,
        "Too many attempts for this username.",
    )
}

pub fn like_user() -> WindowRule {
    rule(
        "like",
        1,
        30,
        KeyStrategy::IdentityOrIp,
        false,
        "Too many likes. Please slow down.",
    )
}

pub fn like_ip() -> WindowRule {
    rule(
        "like",
        1,
        60,
        KeyStrategy::Ip,
        false,
        "Too many likes from this network. Please slow down.",
    )
}

pub fn like_post() -> WindowRule {
    rule(
        "like",
        1,
        5,
        KeyStrategy::IdentityAndParam {
            scope: "post",
            param: "post_id",
        },
        false,
        "You are toggling this like too often.",
    )
}
