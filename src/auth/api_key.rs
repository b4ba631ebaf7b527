//! API key check for service endpoints.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::config::ApiKeyConfig;
use crate::http::request::ClientIp;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Accepted keys and the header that carries them.
#[derive(Debug, Clone)]
pub struct ApiKeys {
    enabled: bool,
    header: String,
    keys: Vec<String>,
}

impl ApiKeys {
    pub fn from_config(config: &ApiKeyConfig) -> Self {
        Self {
            enabled: config.enabled,
            header: config.header.to_lowercase(),
            keys: config.keys.iter().filter(|k| !k.is_empty()).cloned().collect(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Every configured key is compared so the match position does not leak.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(presented) = presented else {
            return false;
        };
        self.keys.iter().fold(false, |found, key| {
            let eq: bool = presented.as_bytes().ct_eq(key.as_bytes()).into();
            found | eq
        })
    }
}

/// Middleware rejecting requests without a valid API key with 403.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let inner = state.inner.load_full();
    let presented = request
        .headers()
        .get(inner.api_keys.header())
        .and_then(|h| h.to_str().ok());

    if inner.api_keys.accepts(presented) {
        return next.run(request).await;
    }

    let ip = request.extensions().get::<ClientIp>().map(|c| c.0);
    tracing::warn!(ip = ?ip, path = %request.uri().path(), "api key rejected");
    state.stats.record_auth_failure();
    ApiError::Forbidden.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(enabled: bool) -> ApiKeys {
        ApiKeys::from_config(&ApiKeyConfig {
            enabled,
            header: "X-API-Key".into(),
            keys: vec!["alpha".into(), "beta".into(), String::new()],
        })
    }

    #[test]
    fn accepts_any_configured_key() {
        let k = keys(true);
        assert!(k.accepts(Some("alpha")));
        assert!(k.accepts(Some("beta")));
        assert_eq!(k.header(), "x-api-key");
    }

    #[test]
    fn rejects_missing_wrong_and_empty_keys() {
        let k = keys(true);
        assert!(!k.accepts(None));
        assert!(!k.accepts(Some("gamma")));
        assert!(!k.accepts(Some("")));
        assert!(!k.accepts(Some("alph")));
    }

    #[test]
    fn disabled_accepts_everything() {
        assert!(keys(false).accepts(None));
    }
}
