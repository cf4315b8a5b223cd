/// Per-client-IP rate limiting
use crate::{
    api::middleware::client_ip,
    context::AppContext,
    error::ApiError,
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovernorLimiter,
};
use std::{net::IpAddr, num::NonZeroU32, sync::Arc};

type KeyedLimiter = GovernorLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Rate limiter keyed by client IP
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<KeyedLimiter>,
    requests_per_minute: u32,
}

impl RateLimiter {
    /// `requests_per_minute` of zero is treated as one
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(GovernorLimiter::keyed(Quota::per_minute(per_minute))),
            requests_per_minute: per_minute.get(),
        }
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        self.limiter
            .check_key(&ip)
            .map_err(|_| ApiError::RateLimitExceeded)
    }

    pub fn limit(&self) -> u32 {
        self.requests_per_minute
    }

    /// Drop state for clients whose quota has fully replenished
    pub fn retain_recent(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.len()
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(&request) else {
        // No peer address (in-process calls); nothing to key on
        return next.run(request).await;
    };

    if let Err(err) = ctx.rate_limiter.check(ip) {
        tracing::warn!(%ip, "Rate limit exceeded");
        return err.into_response();
    }

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.rate_limiter.limit().to_string()) {
        response.headers_mut().insert("X-RateLimit-Limit", value);
    }
    response
}
