use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::QuantaClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use crate::config::Settings;
use crate::error::ApiError;

const FALLBACK_REQUESTS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

fn quota(settings: &Settings) -> Quota {
    let burst = NonZeroU32::new(settings.rate_limit_requests).unwrap_or(FALLBACK_REQUESTS);
    let window = Duration::from_secs(u64::from(settings.rate_limit_window_seconds));

    // One token is replenished every window / burst
    let period = window / burst.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_minute(burst))
        .allow_burst(burst)
}

/// Per client IP token bucket: `rate_limit_requests` per
/// `rate_limit_window_seconds`.
pub struct IpRateLimiter {
    limiter: RateLimiter<IpAddr, DashMapStateStore<IpAddr>, QuantaClock, NoOpMiddleware>,
}

impl IpRateLimiter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota(settings)),
        }
    }

    pub fn check_ip(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Drop buckets that have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

/// Client IP from proxy headers
fn extract_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        // First hop is the client
        if let Some(ip) = forwarded
            .split(',')
            .next()
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
        {
            return Some(ip);
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

pub async fn ip_rate_limit_middleware(
    State(ip_limiter): State<Arc<IpRateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client_ip =
        extract_client_ip(request.headers()).unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    if ip_limiter.check_ip(client_ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(client_ip = %client_ip, "Rate limit exceeded");
        Err(ApiError::rate_limit("Too many requests, slow down"))
    }
}
