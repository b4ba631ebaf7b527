//! Public API handlers.

use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::http::dashboard::DASHBOARD_HTML;
use crate::http::request::{ClientIp, CurrentSession, JsonBody};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_in_secs: u64,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub email: String,
    pub created_at: String,
    pub expires_in_secs: u64,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let inner = state.inner.load();
    Json(RootResponse {
        message: format!("{} API running", inner.config.service.name),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let inner = state.inner.load();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: inner.config.service.name.clone(),
        version: inner.config.service.version.clone(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let inner = state.inner.load();
    Json(StatusResponse {
        status: "running",
        service: inner.config.service.product.clone(),
    })
}

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub async fn login(
    State(state): State<AppState>,
    client: Option<Extension<ClientIp>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let inner = state.inner.load_full();

    if inner.users.verify(&request.email, &request.password) {
        let session = state.sessions.create(&request.email, inner.session_policy());
        tracing::info!(email = %session.email, "login succeeded");
        metrics::record_login("success");
        metrics::record_active_sessions(state.sessions.active_count());
        return Ok(Json(LoginResponse {
            expires_in_secs: session.expires_in(Instant::now()).as_secs(),
            token: session.token,
            email: session.email,
        }));
    }

    let ip = client.map(|Extension(ClientIp(ip))| ip);
    tracing::warn!(email = %request.email, ip = ?ip, "login failed");
    metrics::record_login("failure");
    state.stats.record_auth_failure();

    if let Some(ip) = ip {
        let auth = &inner.config.auth;
        let tripped = state.login_failures.record(
            ip,
            auth.max_failed_logins,
            Duration::from_secs(auth.failed_login_window_secs),
            Instant::now(),
        );
        if tripped {
            let block = Duration::from_secs(inner.config.firewall.block_secs);
            state.blocklist.block(ip, "too many failed logins", Some(block));
            metrics::record_auto_block();
        }
    }

    Err(ApiError::InvalidCredentials)
}

pub async fn session(CurrentSession(session): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        expires_in_secs: session.expires_in(Instant::now()).as_secs(),
        created_at: session.created_at.to_rfc3339(),
        email: session.email,
    })
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> impl IntoResponse {
    state.sessions.revoke(&session.token);
    tracing::info!(email = %session.email, "logged out");
    metrics::record_active_sessions(state.sessions.active_count());
    (StatusCode::OK, Json(serde_json::json!({ "status": "logged out" })))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
