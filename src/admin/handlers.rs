//! Admin API handlers.

use std::net::IpAddr;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::SessionSummary;
use crate::http::request::JsonBody;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics::{self, CountersSnapshot};
use crate::config::MAX_DURATION_SECS as MAX_BLOCK_SECS;
use crate::security::blocklist::BlockedEntry;

#[derive(Serialize)]
pub struct SystemStatus {
    pub service: String,
    pub version: String,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub in_flight: u64,
}

#[derive(Serialize)]
pub struct AnalyticsSummary {
    #[serde(flatten)]
    pub counters: CountersSnapshot,
    pub active_sessions: usize,
    pub tracked_clients: usize,
    pub dynamic_blocks: usize,
    pub static_blocks: usize,
}

#[derive(Deserialize)]
pub struct BlockRequest {
    pub ip: IpAddr,
    pub reason: Option<String>,
    /// Omit for a permanent block.
    pub duration_secs: Option<u64>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load();
    Json(SystemStatus {
        service: inner.config.service.product.clone(),
        version: inner.config.service.version.clone(),
        status: "operational",
        uptime_secs: state.uptime().as_secs(),
        in_flight: state.connections.active_count(),
    })
}

pub async fn get_analytics(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(AnalyticsSummary {
        counters: state.stats.snapshot(),
        active_sessions: state.sessions.active_count(),
        tracked_clients: state.limiter.tracked_clients(),
        dynamic_blocks: state.blocklist.dynamic_count(),
        static_blocks: state.blocklist.static_count(),
    })
}

pub async fn list_blocked(State(state): State<AppState>) -> Json<Vec<BlockedEntry>> {
    Json(state.blocklist.list())
}

pub async fn block_ip(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<BlockRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let duration = match request.duration_secs {
        Some(0) => return Err(ApiError::BadRequest("duration_secs must be greater than 0".into())),
        Some(secs) if secs > MAX_BLOCK_SECS => {
            return Err(ApiError::BadRequest(format!(
                "duration_secs must be at most {}",
                MAX_BLOCK_SECS
            )))
        }
        secs => secs.map(Duration::from_secs),
    };
    let reason = request.reason.unwrap_or_else(|| "manual".to_string());
    state.blocklist.block(request.ip, reason, duration);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "blocked": request.ip })),
    ))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ip: IpAddr = ip
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid ip address: {}", ip)))?;

    if state.blocklist.unblock(ip) {
        tracing::info!(ip = %ip, "ip unblocked");
        Ok(Json(serde_json::json!({ "unblocked": ip })))
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.sessions.list())
}

pub async fn revoke_sessions(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Json<serde_json::Value> {
    let revoked = state.sessions.revoke_user(&email);
    tracing::info!(email = %email, revoked, "sessions revoked");
    metrics::record_active_sessions(state.sessions.active_count());
    Json(serde_json::json!({ "email": email, "revoked": revoked }))
}
