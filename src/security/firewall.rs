//! Firewall middleware.
//! Resolves the client IP, then applies the blocklist, geo and detector checks.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::ClientIp;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::headers::client_ip;

pub async fn firewall_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let inner = state.inner.load_full();
    let ip = client_ip(req.headers(), addr, inner.config.security.trust_forwarded_for);
    req.extensions_mut().insert(ClientIp(ip));

    // 1. Blocklist
    if let Some(reason) = state.blocklist.check(ip) {
        tracing::debug!(ip = %ip, reason = %reason, "request from blocked ip");
        metrics::record_blocked("blocklist");
        state.stats.record_blocked();
        return ApiError::IpBlocked.into_response();
    }

    // 2. Geo
    if let Some(country) = inner.geo.denied_country(ip) {
        tracing::info!(ip = %ip, country = %country, "request from denied region");
        metrics::record_blocked("geo");
        state.stats.record_blocked();
        return ApiError::RegionDenied.into_response();
    }

    // 3. Detector
    if let Some(finding) = inner.detector.scan(&req) {
        tracing::warn!(
            ip = %ip,
            location = %finding.location,
            keyword = %finding.keyword,
            path = %req.uri().path(),
            "threat detected"
        );
        metrics::record_threat(&finding.location.to_string());
        state.stats.record_threat();
        state.strike(ip, "threat detector hits");
        return ApiError::RequestBlocked.into_response();
    }

    next.run(req).await
}
