//! Response helpers.
//!
//! Every error leaves the server as `{"error": "<message>"}` with a status
//! matching the failed check.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced to API clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("rate limit")]
    RateLimited,
    #[error("forbidden")]
    Forbidden,
    #[error("ip blocked")]
    IpBlocked,
    #[error("region denied")]
    RegionDenied,
    #[error("request blocked")]
    RequestBlocked,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid session")]
    InvalidSession,
    #[error("unauthorized")]
    Unauthorized,
    #[error("server busy")]
    Overloaded,
    #[error("{0}")]
    BadRequest(String),
    /// A JSON body that could not be read or deserialized.
    #[error("{1}")]
    InvalidBody(StatusCode, String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.status(), rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Forbidden
            | ApiError::IpBlocked
            | ApiError::RegionDenied
            | ApiError::RequestBlocked => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials | ApiError::InvalidSession | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
