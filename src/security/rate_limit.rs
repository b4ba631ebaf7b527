//! Sliding-window rate limiting per client IP.
//!
//! Each client keeps the timestamps of its admitted requests. A request is
//! admitted while fewer than `limit` of them fall inside the trailing window.
//! Rejected requests are not recorded, so a client that backs off recovers
//! as soon as its oldest admitted request leaves the window.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::http::request::ClientIp;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests still available in the current window.
    pub remaining: u32,
    /// When rejected, time until the oldest admitted request leaves the window.
    pub retry_after: Duration,
}

/// Per-IP sliding window counters.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<IpAddr, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a request from `ip` at the current instant.
    pub fn check(&self, ip: IpAddr, limit: u32, window: Duration) -> RateDecision {
        self.check_at(ip, limit, window, Instant::now())
    }

    /// Check and record a request from `ip` at `now`.
    pub fn check_at(&self, ip: IpAddr, limit: u32, window: Duration, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(ip).or_default();
        let hits = entry.value_mut();
        evict(hits, window, now);

        let limit = limit as usize;
        if hits.len() < limit {
            hits.push_back(now);
            RateDecision {
                allowed: true,
                remaining: (limit - hits.len()) as u32,
                retry_after: Duration::ZERO,
            }
        } else {
            let retry_after = hits
                .front()
                .and_then(|oldest| oldest.checked_add(window))
                .map(|reset| reset.saturating_duration_since(now))
                .unwrap_or(window);
            RateDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            }
        }
    }

    /// Drop windows with no request inside the trailing `window`.
    /// Returns the number of clients forgotten.
    pub fn purge_idle(&self, window: Duration, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, hits| {
            evict(hits, window, now);
            !hits.is_empty()
        });
        before - self.windows.len()
    }

    /// Number of clients with a live window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

fn evict(hits: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while let Some(oldest) = hits.front() {
        if now.saturating_duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

/// Middleware applying the sliding window limit to every request.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let inner = state.inner.load_full();
    let config = &inner.config.rate_limit;
    if !config.enabled {
        return next.run(request).await;
    }

    let ip = request
        .extensions()
        .get::<ClientIp>()
        .map(|c| c.0)
        .unwrap_or_else(|| addr.ip());

    let decision = state
        .limiter
        .check(ip, config.max_requests, Duration::from_secs(config.window_secs));

    if decision.allowed {
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
            response.headers_mut().insert("x-ratelimit-remaining", value);
        }
        return response;
    }

    tracing::warn!(ip = %ip, retry_after = ?decision.retry_after, "rate limit exceeded");
    metrics::record_rate_limited();
    state.stats.record_rate_limited();
    state.strike(ip, "rate limit violations");

    let retry_secs = decision.retry_after.as_secs().max(1);
    let mut response = ApiError::RateLimited.into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for expected_remaining in (0..3).rev() {
            let d = limiter.check_at(ip("10.0.0.1"), 3, WINDOW, now);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
        let d = limiter.check_at(ip("10.0.0.1"), 3, WINDOW, now);
        assert!(!d.allowed);
        assert_eq!(d.retry_after, WINDOW);
    }

    #[test]
    fn window_slides_one_request_at_a_time() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let client = ip("10.0.0.2");

        assert!(limiter.check_at(client, 2, WINDOW, start).allowed);
        assert!(limiter.check_at(client, 2, WINDOW, start + Duration::from_secs(30)).allowed);
        let blocked = limiter.check_at(client, 2, WINDOW, start + Duration::from_secs(45));
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after, Duration::from_secs(15));

        // The first request has left the window; the second has not.
        assert!(limiter.check_at(client, 2, WINDOW, start + Duration::from_secs(60)).allowed);
        assert!(!limiter.check_at(client, 2, WINDOW, start + Duration::from_secs(61)).allowed);
    }

    #[test]
    fn rejected_requests_are_not_counted() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let client = ip("10.0.0.3");

        assert!(limiter.check_at(client, 1, WINDOW, start).allowed);
        for s in 1..50 {
            assert!(!limiter.check_at(client, 1, WINDOW, start + Duration::from_secs(s)).allowed);
        }
        assert!(limiter.check_at(client, 1, WINDOW, start + WINDOW).allowed);
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        assert!(limiter.check_at(ip("10.0.0.4"), 1, WINDOW, now).allowed);
        assert!(!limiter.check_at(ip("10.0.0.4"), 1, WINDOW, now).allowed);
        assert!(limiter.check_at(ip("10.0.0.5"), 1, WINDOW, now).allowed);
    }

    #[test]
    fn purge_forgets_idle_clients() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.check_at(ip("10.0.0.6"), 5, WINDOW, start);
        limiter.check_at(ip("10.0.0.7"), 5, WINDOW, start + Duration::from_secs(50));
        assert_eq!(limiter.tracked_clients(), 2);

        let purged = limiter.purge_idle(WINDOW, start + Duration::from_secs(70));
        assert_eq!(purged, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
