//! Router-level tests for the public API.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use titan::http::HttpServer;

mod common;
use common::{body_json, from_peer, get, local, post_json, test_config, API_KEY, EMAIL, PASSWORD};

#[tokio::test]
async fn root_and_health() {
    let app = HttpServer::new(test_config()).router();

    let res = app.clone().oneshot(get("/", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"message": "Titan API running"}));

    let res = app.oneshot(get("/health", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"status": "ok", "service": "Titan", "version": "0.1.0"})
    );
}

#[tokio::test]
async fn status_requires_api_key() {
    let app = HttpServer::new(test_config()).router();

    let res = app.clone().oneshot(get("/status", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await, json!({"error": "forbidden"}));

    let wrong = from_peer(
        Request::get("/status")
            .header("X-API-Key", "nope")
            .body(Body::empty())
            .unwrap(),
        local(),
    );
    let res = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let right = from_peer(
        Request::get("/status")
            .header("X-API-Key", API_KEY)
            .body(Body::empty())
            .unwrap(),
        local(),
    );
    let res = app.oneshot(right).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"status": "running", "service": "TitanFusion"})
    );
}

#[tokio::test]
async fn disabled_api_key_check_lets_status_through() {
    let mut config = test_config();
    config.api_key.enabled = false;
    let app = HttpServer::new(config).router();

    let res = app.oneshot(get("/status", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let app = HttpServer::new(test_config()).router();
    let res = app.oneshot(get("/nope", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await, json!({"error": "not found"}));
}

#[tokio::test]
async fn dashboard_serves_html() {
    let app = HttpServer::new(test_config()).router();
    let res = app.oneshot(get("/dashboard", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/health"));
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = HttpServer::new(test_config()).router();
    let res = app.oneshot(get("/health", local())).await.unwrap();

    let headers = res.headers();
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("x-ratelimit-remaining"));
}

#[tokio::test]
async fn incoming_request_id_is_echoed() {
    let app = HttpServer::new(test_config()).router();
    let req = from_peer(
        Request::get("/health")
            .header("x-request-id", "trace-me-123")
            .body(Body::empty())
            .unwrap(),
        local(),
    );
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-me-123");
}

#[tokio::test]
async fn security_headers_can_be_disabled() {
    let mut config = test_config();
    config.security.enable_headers = false;
    let app = HttpServer::new(config).router();

    let res = app.oneshot(get("/health", local())).await.unwrap();
    assert!(!res.headers().contains_key("x-frame-options"));
}

#[tokio::test]
async fn login_session_logout_flow() {
    let app = HttpServer::new(test_config()).router();

    let res = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "Admin@Example.com", "password": PASSWORD}),
            local(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 48);
    assert_eq!(body["email"], EMAIL);
    assert!(body["expires_in_secs"].as_u64().unwrap() > 3500);

    let with_token = |method: &str, uri: &str| {
        from_peer(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
            local(),
        )
    };

    let res = app.clone().oneshot(with_token("GET", "/auth/session")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["email"], EMAIL);
    assert!(body["created_at"].as_str().is_some());

    let res = app.clone().oneshot(with_token("POST", "/auth/logout")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"status": "logged out"}));

    let res = app.oneshot(with_token("GET", "/auth/session")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await, json!({"error": "invalid session"}));
}

#[tokio::test]
async fn session_requires_bearer_token() {
    let app = HttpServer::new(test_config()).router();
    let res = app.oneshot(get("/auth/session", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = HttpServer::new(test_config()).router();
    let res = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": EMAIL, "password": "wrong"}),
            local(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await, json!({"error": "invalid credentials"}));
}

#[tokio::test]
async fn malformed_login_bodies_get_json_errors() {
    let app = HttpServer::new(test_config()).router();

    let res = app
        .clone()
        .oneshot(post_json("/auth/login", json!({"email": "a@b.c"}), local()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
    let error = body_json(res).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("password"), "{}", error);

    let syntax = from_peer(
        Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\":"))
            .unwrap(),
        local(),
    );
    let res = app.clone().oneshot(syntax).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["error"].is_string());

    let untyped = from_peer(
        Request::post("/auth/login")
            .body(Body::from(json!({"email": EMAIL, "password": PASSWORD}).to_string()))
            .unwrap(),
        local(),
    );
    let res = app.oneshot(untyped).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body_json(res).await["error"].is_string());
}

#[tokio::test]
async fn login_past_user_cap_invalidates_oldest_token() {
    let mut config = test_config();
    config.auth.max_sessions_per_user = 2;
    let app = HttpServer::new(config).router();

    let mut tokens = Vec::new();
    for _ in 0..3 {
        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({"email": EMAIL, "password": PASSWORD}),
                local(),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        tokens.push(body_json(res).await["token"].as_str().unwrap().to_string());
    }

    let session = |token: &str| {
        from_peer(
            Request::get("/auth/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
            local(),
        )
    };

    let res = app.clone().oneshot(session(&tokens[0])).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await, json!({"error": "invalid session"}));

    for token in &tokens[1..] {
        let res = app.clone().oneshot(session(token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn repeated_failed_logins_block_the_ip() {
    let mut config = test_config();
    config.auth.max_failed_logins = 3;
    let server = HttpServer::new(config);
    let app = server.router();
    let attacker = "203.0.113.20".parse().unwrap();

    for _ in 0..3 {
        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({"email": EMAIL, "password": "guess"}),
                attacker,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused now.
    let res = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"email": EMAIL, "password": PASSWORD}),
            attacker,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await, json!({"error": "ip blocked"}));

    // Other clients are unaffected.
    let res = app.oneshot(get("/health", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(server.state().stats.snapshot().auth_failures, 3);
}

#[tokio::test]
async fn in_flight_cap_returns_503() {
    let mut config = test_config();
    config.listener.max_connections = 0;
    let app = HttpServer::new(config).router();

    let res = app.oneshot(get("/health", local())).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(res).await, json!({"error": "server busy"}));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = test_config();
    config.security.max_body_size = 16;
    let app = HttpServer::new(config).router();

    let res = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": EMAIL, "password": "x".repeat(64)}),
            local(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
