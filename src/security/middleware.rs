//! Rate limiting middleware.
//!
//! Wraps a [`RateLimiter`] and one [`RateLimitPolicy`]. Layers can be
//! stacked (a broad `api` gate around a tighter `submission` gate); the
//! innermost gate's headers are the ones the client sees.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::RateLimitPolicy;
use crate::observability::metrics;
use crate::security::client_key::rate_limit_key;
use crate::security::rate_limit::{RateLimitDecision, RateLimiter};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// State for one rate limit gate.
#[derive(Clone)]
pub struct RateLimitGate {
    pub name: &'static str,
    pub limiter: Arc<RateLimiter>,
    pub policy: RateLimitPolicy,
}

impl RateLimitGate {
    pub fn new(name: &'static str, limiter: Arc<RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self {
            name,
            limiter,
            policy,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedBody {
    error: &'static str,
    code: &'static str,
    retry_after_secs: u64,
}

/// Middleware function for fixed-window rate limiting.
pub async fn rate_limit_middleware(
    State(gate): State<RateLimitGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = rate_limit_key(request.headers());
    let decision = gate.limiter.check_rate_limit(&client, &gate.policy);
    let now = gate.limiter.now();
    let reset_secs = decision.retry_after_secs(now);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %client,
            policy = gate.name,
            retry_after_secs = reset_secs,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(gate.name);
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, reset_secs.to_string())],
            Json(RateLimitedBody {
                error: "Too many requests",
                code: "RATE_LIMITED",
                retry_after_secs: reset_secs,
            }),
        )
            .into_response()
    };

    set_rate_limit_headers(response.headers_mut(), &decision, reset_secs);
    response
}

/// Attach `x-ratelimit-*` headers unless an inner gate already did.
fn set_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision, reset_secs: u64) {
    if headers.contains_key(X_RATELIMIT_LIMIT) {
        return;
    }
    let pairs = [
        (X_RATELIMIT_LIMIT, u64::from(decision.limit)),
        (X_RATELIMIT_REMAINING, u64::from(decision.remaining)),
        (X_RATELIMIT_RESET, reset_secs),
    ];
    for (name, value) in pairs {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
}
