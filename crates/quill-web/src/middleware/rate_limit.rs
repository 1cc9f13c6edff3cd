//! Rate-limit keys and enforcement for the authentication routes.
//!
//! Keys have the form `"<action>:<caller>"`. Before login the caller is the
//! client IP taken from `x-forwarded-for`, then `x-real-ip`, then the socket
//! peer address. When none of these resolve, every anonymous caller shares
//! the bare action name as its key.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use quill_core::{RateLimitRule, RateLimiter};

use crate::error::AppError;

/// Best-effort client address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    /// Limiter key for `action`, e.g. `"register:203.0.113.7"`.
    pub fn key(&self, action: &str) -> String {
        match &self.0 {
            Some(ip) => format!("{action}:{ip}"),
            None => action.to_string(),
        }
    }

    fn from_headers(headers: &HeaderMap) -> Option<String> {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        forwarded.or_else(real_ip).map(str::to_string)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = Self::from_headers(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        Ok(ClientIp(ip))
    }
}

/// Records an attempt under `key` and fails with 429 and `message` once the
/// rule's budget is spent.
pub fn enforce(
    limiter: &RateLimiter,
    key: &str,
    rule: &RateLimitRule,
    message: &str,
) -> Result<(), AppError> {
    if limiter.check_rule(key, rule) {
        return Ok(());
    }
    tracing::warn!("Rate limit exceeded: key={key}, limit={}/{}s", rule.limit, rule.window_secs);
    Err(AppError::RateLimited(message.to_string()))
}
