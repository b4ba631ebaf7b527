//! Request-scoped data.
//!
//! # Responsibilities
//! - Request ID header name shared by the request-id layers
//! - Client IP resolved by the firewall, stored in request extensions
//! - Session extraction from `Authorization: Bearer <token>`
//! - JSON bodies whose rejections render as [`ApiError`]

use std::net::IpAddr;

use axum::extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request};
use axum::http::{header, request::Parts, HeaderMap};
use axum::Json;

use crate::auth::Session;
use crate::http::response::ApiError;
use crate::http::server::AppState;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Client address as resolved by the firewall middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A live session resolved from the bearer token. Rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::InvalidSession)?;
        let policy = state.inner.load().session_policy();
        state
            .sessions
            .validate(token, policy)
            .map(CurrentSession)
            .ok_or(ApiError::InvalidSession)
    }
}

/// `Json<T>` with malformed bodies rejected as `{"error": ...}`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(JsonBody(value))
    }
}
