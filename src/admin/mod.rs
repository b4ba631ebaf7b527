//! Operator API, served on its own listener behind a bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::handlers::not_found;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/analytics", get(get_analytics))
        .route("/admin/blocked", get(list_blocked).post(block_ip))
        .route("/admin/blocked/{ip}", delete(unblock_ip))
        .route("/admin/sessions", get(list_sessions))
        .route("/admin/sessions/{email}", delete(revoke_sessions))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
