//! Metrics collection and exposition.
//!
//! # Metrics
//! - `titan_requests_total` (counter): requests by method, status
//! - `titan_request_duration_seconds` (histogram): latency distribution
//! - `titan_rate_limited_total` (counter): limiter rejections
//! - `titan_blocked_total` (counter): firewall refusals by stage
//! - `titan_threats_total` (counter): detector hits by location
//! - `titan_logins_total` (counter): login attempts by outcome
//! - `titan_auto_blocks_total` (counter): blocks added by strike counters
//! - `titan_active_sessions` (gauge): live sessions
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.
//! [`Counters`] keeps a few totals in-process for the admin API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

/// Install the Prometheus recorder with its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("titan_requests_total", &labels).increment(1);
    histogram!("titan_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("titan_rate_limited_total").increment(1);
}

pub fn record_blocked(stage: &str) {
    counter!("titan_blocked_total", &[("stage", stage.to_string())]).increment(1);
}

pub fn record_threat(location: &str) {
    counter!("titan_threats_total", &[("location", location.to_string())]).increment(1);
}

pub fn record_login(outcome: &str) {
    counter!("titan_logins_total", &[("outcome", outcome.to_string())]).increment(1);
}

pub fn record_auto_block() {
    counter!("titan_auto_blocks_total").increment(1);
}

pub fn record_active_sessions(count: usize) {
    gauge!("titan_active_sessions").set(count as f64);
}

/// Process-local totals, independent of the exporter.
#[derive(Debug, Default)]
pub struct Counters {
    requests: AtomicU64,
    rate_limited: AtomicU64,
    blocked: AtomicU64,
    threats: AtomicU64,
    auth_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub requests: u64,
    pub rate_limited: u64,
    pub blocked: u64,
    pub threats: u64,
    pub auth_failures: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_threat(&self) {
        self.threats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            threats: self.threats.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
        }
    }
}
