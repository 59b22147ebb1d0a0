/// Rate Limiting System
use crate::{config::RateLimitConfig, context::AppContext};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Paths that are never throttled
const EXEMPT_PREFIXES: &[&str] = &["/health", "/ckbfs/health", "/metrics"];

/// Global request limiter
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    limiter: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(per_minute);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            enabled: config.enabled,
            limiter: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    /// Take one request from the bucket; `false` when exhausted
    pub fn check(&self) -> bool {
        !self.enabled || self.limiter.check().is_ok()
    }
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) || ctx.rate_limiter.check() {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "rate_limit_exceeded");
    crate::metrics::record_error("RATE_LIMITED");

    let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    response
}
