//! Client identification for rate limiting.
//!
//! The portal runs behind a load balancer, so the peer address is the
//! balancer's. The client is the first hop listed in `X-Forwarded-For`.
//! Requests without a usable header all share the [`UNKNOWN_CLIENT`] bucket.

use axum::http::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Bucket for requests that carry no forwarded address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit identifier for a request.
pub fn rate_limit_key(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
