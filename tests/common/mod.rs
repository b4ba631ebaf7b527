//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::Response,
};
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use titan::config::TitanConfig;
use titan::http::HttpServer;
use titan::lifecycle::Shutdown;

pub const API_KEY: &str = "test-api-key";
pub const EMAIL: &str = "admin@example.com";
/// Matches the default user's hash.
pub const PASSWORD: &str = "123456";

/// Defaults with a known API key and room for a few hundred requests.
pub fn test_config() -> TitanConfig {
    let mut config = TitanConfig::default();
    config.api_key.keys = vec![API_KEY.to_string()];
    config.rate_limit.max_requests = 500;
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

pub fn local() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

/// Attach the peer address the server would see on a real socket.
pub fn from_peer(mut request: Request<Body>, ip: IpAddr) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40000)));
    request
}

pub fn get(uri: &str, ip: IpAddr) -> Request<Body> {
    from_peer(Request::get(uri).body(Body::empty()).unwrap(), ip)
}

pub fn post_json(uri: &str, body: serde_json::Value, ip: IpAddr) -> Request<Body> {
    from_peer(
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        ip,
    )
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A server on an ephemeral port, stopped through `shutdown`.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<TitanConfig>,
    pub handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

pub async fn spawn_server(config: TitanConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        server
            .run(listener, config_updates, server_shutdown)
            .await
            .expect("server failed");
    });

    TestServer {
        addr,
        shutdown,
        config_tx,
        handle,
    }
}
