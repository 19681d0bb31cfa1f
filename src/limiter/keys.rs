use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::request::Parts;

use crate::store::encode_segment;
use crate::utils::Claims;

/// 限流键，格式 `<feature>:<scope>:<identifier>[:<scope>:<identifier>]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn new(feature: &str) -> Self {
        Self(encode_segment(feature))
    }

    pub fn scope(mut self, scope: &str, identifier: &str) -> Self {
        self.0.push(':');
        self.0.push_str(scope);
        self.0.push(':');
        self.0.push_str(&encode_segment(identifier));
        self
    }

    /// 令牌桶键带 `tb:` 前缀，和窗口计数器分开
    pub fn bucket(self) -> Self {
        Self(format!("tb:{}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 生成限流键时可用的请求信息
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    pub identity: Option<String>,
    pub client_ip: String,
    pub params: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts, params: HashMap<String, String>, trust_proxy: bool) -> Self {
        Self {
            identity: parts.extensions.get::<Claims>().map(|c| c.sub.clone()),
            client_ip: client_ip(parts, trust_proxy),
            params,
            body: None,
        }
    }

    fn body_field(&self, field: &str) -> String {
        let value = self
            .body
            .as_ref()
            .and_then(|b| b.get(field))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            "unknown".to_string()
        } else {
            normalized
        }
    }
}

/// 限流键的生成方式
#[derive(Debug, Clone)]
pub enum KeyStrategy {
    /// 登录用户按用户 ID，否则按 IP
    IdentityOrIp,
    /// 只按 IP
    Ip,
    /// 按请求体里的字段（小写、去空白）
    BodyField(&'static str),
    /// 按用户（或 IP）加路径参数，每个资源独立计数
    IdentityAndParam {
        scope: &'static str,
        param: &'static str,
    },
}

impl KeyStrategy {
    pub fn needs_body(&self) -> bool {
        matches!(self, KeyStrategy::BodyField(_))
    }

    pub fn derive(&self, feature: &str, ctx: &RequestContext) -> RateLimitKey {
        let key = RateLimitKey::new(feature);
        match self {
            KeyStrategy::IdentityOrIp => identity_or_ip(key, ctx),
            KeyStrategy::Ip => key.scope("ip", &ctx.client_ip),
            KeyStrategy::BodyField(field) => key.scope("user", &ctx.body_field(field)),
            KeyStrategy::IdentityAndParam { scope, param } => {
                let resource = ctx.params.get(*param).map(String::as_str).unwrap_or("unknown");
                identity_or_ip(key, ctx).scope(scope, resource)
            }
        }
    }
}

fn identity_or_ip(key: RateLimitKey, ctx: &RequestContext) -> RateLimitKey {
    match &ctx.identity {
        Some(id) => key.scope("user", id),
        None => key.scope("ip", &ctx.client_ip),
    }
}

/// 客户端地址，默认取连接地址。
/// 只有 `trust_proxy` 打开时才读 x-real-ip，其次 x-forwarded-for 第一个非空值。
pub fn client_ip(parts: &Parts, trust_proxy: bool) -> String {
    let forwarded = if trust_proxy {
        proxy_header_ip(parts)
    } else {
        None
    };

    let raw = forwarded
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    normalize_ip(&raw)
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|h| h.to_str().ok())
}

fn proxy_header_ip(parts: &Parts) -> Option<String> {
    header(parts, "x-real-ip")
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            header(parts, "x-forwarded-for")?
                .split(',')
                .map(str::trim)
                .find(|ip| !ip.is_empty())
        })
        .map(str::to_string)
}

/// IPv6 地址按 /64 前缀归并，避免同一客户端轮换地址绕过限流
pub fn normalize_ip(raw: &str) -> String {
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => {
                let s = v6.segments();
                format!("{:x}:{:x}:{:x}:{:x}::/64", s[0], s[1], s[2], s[3])
            }
        },
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn builds_namespaced_keys() {
        let key = RateLimitKey::new("like").scope("user", "7").scope("post", "p:1");
        assert_eq!(key.as_str(), "like:user:7:post:p%3A1");
        assert_eq!(
            RateLimitKey::new("feed").scope("ip", "1.2.3.4").bucket().as_str(),
            "tb:feed:ip:1.2.3.4"
        );
    }

    #[test]
    fn identity_wins_over_ip() {
        let ctx = RequestContext {
            identity: Some("42".into()),
            client_ip: "10.0.0.1".into(),
            ..Default::default()
        };
        let key = KeyStrategy::IdentityOrIp.derive("logout", &ctx);
        assert_eq!(key.as_str(), "logout:user:42");

        let anon = RequestContext {
            client_ip: "10.0.0.1".into(),
            ..Default::default()
        };
        let key = KeyStrategy::IdentityOrIp.derive("logout", &anon);
        assert_eq!(key.as_str(), "logout:ip:10.0.0.1");
    }

    #[test]
    fn per_resource_keys_are_independent() {
        let mut ctx = RequestContext {
            identity: Some("42".into()),
            ..Default::default()
        };
        let strategy = KeyStrategy::IdentityAndParam {
            scope: "post",
            param: "post_id",
        };

        ctx.params.insert("post_id".into(), "100".into());
        let first = strategy.derive("like", &ctx);
        ctx.params.insert("post_id".into(), "101".into());
        let second = strategy.derive("like", &ctx);

        assert_eq!(first.as_str(), "like:user:42:post:100");
        assert_ne!(first, second);
    }

    #[test]
    fn body_field_is_normalized() {
        let ctx = RequestContext {
            body: Some(serde_json::json!({ "username": "  Alice " })),
            ..Default::default()
        };
        let key = KeyStrategy::BodyField("username").derive("login", &ctx);
        assert_eq!(key.as_str(), "login:user:alice");

        let missing = RequestContext::default();
        let key = KeyStrategy::BodyField("username").derive("login", &missing);
        assert_eq!(key.as_str(), "login:user:unknown");
    }

    fn peer(req: axum::http::request::Builder, addr: &str) -> axum::http::request::Builder {
        let addr: SocketAddr = addr.parse().unwrap();
        req.extension(ConnectInfo(addr))
    }

    #[test]
    fn client_ip_ignores_proxy_headers_by_default() {
        let req = peer(Request::builder(), "198.51.100.7:4000")
            .header("x-real-ip", "10.9.9.1")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), false), "198.51.100.7");

        let req = Request::builder()
            .header("x-real-ip", "10.9.9.1")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), false), "unknown");
    }

    #[test]
    fn trusted_proxy_headers_take_precedence() {
        let req = peer(Request::builder(), "10.0.0.2:4000")
            .header("x-forwarded-for", " , 203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), true), "203.0.113.9");

        let req = peer(Request::builder(), "10.0.0.2:4000")
            .header("x-real-ip", "198.51.100.4")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), true), "198.51.100.4");

        let req = peer(Request::builder(), "10.0.0.2:4000")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), true), "10.0.0.2");
    }

    #[test]
    fn blank_real_ip_falls_through() {
        let req = Request::builder()
            .header("x-real-ip", "   ")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), true), "203.0.113.9");

        let req = peer(Request::builder(), "10.0.0.2:4000")
            .header("x-real-ip", " ")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&parts(req), true), "10.0.0.2");
    }

    #[test]
    fn ipv6_is_reduced_to_prefix() {
        assert_eq!(normalize_ip("2001:db8:1:2:3:4:5:6"), "2001:db8:1:2::/64");
        assert_eq!(normalize_ip("::ffff:192.0.2.1"), "192.0.2.1");
        assert_eq!(normalize_ip("192.0.2.1"), "192.0.2.1");
    }
}
