//! Bearer-key check for the admin listener.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::http::request::bearer_token;
use crate::http::response::ApiError;
use crate::http::server::AppState;

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let inner = state.inner.load_full();
    let expected = inner.config.admin.api_key.as_bytes();

    let authorized = bearer_token(request.headers())
        .map(|token| bool::from(token.as_bytes().ct_eq(expected)))
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "admin request rejected");
    state.stats.record_auth_failure();
    ApiError::Unauthorized.into_response()
}
