//! In-flight request tracking.
//!
//! # Responsibilities
//! - Cap concurrent requests at `listener.max_connections`
//! - Tag each tracked request with a unique ID for tracing
//! - Let shutdown wait for in-flight work to drain

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Relaxed ordering is enough: only uniqueness matters.
static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackedId(u64);

impl TrackedId {
    pub fn new() -> Self {
        Self(REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TrackedId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Counts requests currently inside the service.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot unless `max` are already taken.
    pub fn try_track(&self, max: u64) -> Option<ConnectionGuard> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| ConnectionGuard {
                active: Arc::clone(&self.active),
                id: TrackedId::new(),
            })
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until nothing is in flight or `deadline` passes.
    /// Returns false on timeout.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let wait = async {
            while self.active.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(deadline, wait).await.is_ok()
    }
}

/// Releases its slot on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicU64>,
    id: TrackedId,
}

impl ConnectionGuard {
    pub fn id(&self) -> TrackedId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(request = %self.id, "request finished");
    }
}

/// Rejects with 503 once `listener.max_connections` requests are in flight.
pub async fn connection_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let max = state.inner.load().config.listener.max_connections as u64;
    match state.connections.try_track(max) {
        Some(guard) => {
            tracing::trace!(request = %guard.id(), "request admitted");
            let response = next.run(request).await;
            drop(guard);
            response
        }
        None => {
            tracing::warn!(max_in_flight = max, "in-flight limit reached");
            ApiError::Overloaded.into_response()
        }
    }
}
