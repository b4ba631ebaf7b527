//! Titan API server
//!
//! A small JSON API fronted by a security pipeline, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net (TLS, in-flight cap)
//!          ──▶ http (request id, trace, timeout, body limit, headers)
//!          ──▶ security (blocklist → geo → detector → rate limit)
//!          ──▶ auth (API key, sessions)
//!          ──▶ handlers (/, /health, /status, /dashboard, /auth/*)
//!
//!   Cross-cutting: config (TOML + hot reload), observability (tracing,
//!   Prometheus), lifecycle (signals, janitor, graceful drain), admin API.
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use titan::config::{load_config, watcher::ConfigWatcher, TitanConfig};
use titan::lifecycle::{shutdown_signal, Shutdown};
use titan::observability::{logging, metrics};
use titan::HttpServer;

#[derive(Parser)]
#[command(name = "titan", version, about = "Titan API server")]
struct Args {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "TITAN_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TitanConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "titan starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        users = config.auth.users.len(),
        "Configuration loaded"
    );
    if config.api_key.keys.iter().any(|k| k == "CHANGE_ME") {
        tracing::warn!("Default API key in use, set api_key.keys");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config);

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            server
                .run_tls(
                    addr,
                    Path::new(&tls.cert_path),
                    Path::new(&tls.key_path),
                    config_updates,
                    server_shutdown,
                )
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
