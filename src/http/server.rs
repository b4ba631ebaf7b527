//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request ID, limits, firewall, rate limit)
//! - Hold shared state and swap it on config reload
//! - Run background tasks (janitor, admin listener) next to the server
//! - Drain in-flight requests on shutdown

use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::auth::{api_key::api_key_middleware, ApiKeys, SessionPolicy, SessionStore, UserStore};
use crate::config::{FirewallConfig, TitanConfig};
use crate::http::handlers;
use crate::http::request::X_REQUEST_ID;
use crate::lifecycle::{shutdown::wait as wait_for_shutdown, Janitor};
use crate::net::connection::{connection_limit_middleware, ConnectionTracker};
use crate::net::tls::{load_tls_config, TlsError};
use crate::observability::metrics::{self, Counters};
use crate::security::{
    blocklist::{IpBlocklist, StrikeCounter},
    detector::ThreatDetector,
    firewall::firewall_middleware,
    geo::GeoResolver,
    headers::security_header_layers,
    parse_net,
    rate_limit::{rate_limit_middleware, RateLimiter},
};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls error: {0}")]
    Tls(#[from] TlsError),
    #[error("invalid admin bind address {0}")]
    AdminAddress(String),
}

/// Everything derived from one config snapshot. Replaced wholesale on reload.
pub struct InnerState {
    pub config: TitanConfig,
    pub api_keys: ApiKeys,
    pub users: UserStore,
    pub geo: GeoResolver,
    pub detector: ThreatDetector,
}

impl InnerState {
    pub fn from_config(config: TitanConfig) -> Self {
        Self {
            api_keys: ApiKeys::from_config(&config.api_key),
            users: UserStore::from_config(&config.auth.users),
            geo: GeoResolver::from_config(&config.geo),
            detector: ThreatDetector::from_config(&config.detector),
            config,
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        let auth = &self.config.auth;
        SessionPolicy {
            ttl: Duration::from_secs(auth.session_ttl_secs),
            sliding: auth.sliding_expiration,
            max_per_user: auth.max_sessions_per_user,
        }
    }
}

/// Application state injected into handlers and middleware.
///
/// `inner` is swapped on reload; the runtime tables below it survive.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<RateLimiter>,
    pub blocklist: Arc<IpBlocklist>,
    pub login_failures: Arc<StrikeCounter>,
    pub connections: ConnectionTracker,
    pub stats: Arc<Counters>,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: TitanConfig) -> Self {
        let blocklist = IpBlocklist::new(static_nets(&config.firewall));
        Self {
            inner: Arc::new(ArcSwap::from_pointee(InnerState::from_config(config))),
            sessions: Arc::new(SessionStore::new()),
            limiter: Arc::new(RateLimiter::new()),
            blocklist: Arc::new(blocklist),
            login_failures: Arc::new(StrikeCounter::new()),
            connections: ConnectionTracker::new(),
            stats: Arc::new(Counters::new()),
            started: Instant::now(),
        }
    }

    /// Swap in a new config. Sessions, limiter windows and dynamic blocks
    /// are kept. Listener settings need a restart.
    pub fn apply_config(&self, config: TitanConfig) {
        self.blocklist.replace_static(static_nets(&config.firewall));
        self.inner.store(Arc::new(InnerState::from_config(config)));
        tracing::info!("Configuration reloaded");
    }

    /// Count a policy violation and block the IP once it crosses the threshold.
    pub fn strike(&self, ip: IpAddr, reason: &str) {
        let inner = self.inner.load();
        let firewall = &inner.config.firewall;
        if !firewall.auto_block {
            return;
        }

        let tripped = self.blocklist.record_violation(
            ip,
            firewall.violation_threshold,
            Duration::from_secs(firewall.violation_window_secs),
            Instant::now(),
        );
        if tripped {
            self.blocklist.block(
                ip,
                format!("auto: {}", reason),
                Some(Duration::from_secs(firewall.block_secs)),
            );
            metrics::record_auto_block();
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

fn static_nets(config: &FirewallConfig) -> Vec<ipnet::IpNet> {
    config
        .blocked_ips
        .iter()
        .filter_map(|entry| {
            let net = parse_net(entry);
            if net.is_none() {
                tracing::warn!(entry = %entry, "Ignoring unparseable blocked_ips entry");
            }
            net
        })
        .collect()
}

/// HTTP server for the Titan API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: TitanConfig) -> Self {
        let state = AppState::new(config);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Request order: request id → trace → counters → timeout → body limit →
    /// security headers → in-flight cap → firewall → rate limit → handler.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let snapshot = state.inner.load_full();
        let config = &snapshot.config;

        let protected = Router::new()
            .route("/status", get(handlers::status))
            .route_layer(middleware::from_fn_with_state(state.clone(), api_key_middleware));

        let mut router = Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .route("/dashboard", get(handlers::dashboard))
            .route("/auth/login", post(handlers::login))
            .route("/auth/session", get(handlers::session))
            .route("/auth/logout", post(handlers::logout))
            .merge(protected)
            .fallback(handlers::not_found)
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn_with_state(state.clone(), connection_limit_middleware))
                    .layer(middleware::from_fn_with_state(state.clone(), firewall_middleware))
                    .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware)),
            )
            .with_state(state.clone());

        if config.security.enable_headers {
            for layer in security_header_layers() {
                router = router.layer(layer);
            }
        }

        // Each `.layer` wraps the previous ones, so the request id layers run first.
        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(state, track_request))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Router for in-process tests. Requests need a `ConnectInfo<SocketAddr>`
    /// extension.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<TitanConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let background = self.spawn_background(config_updates, &shutdown).await?;
        let grace = self.grace_period();
        let connections = self.state.connections.clone();

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown.resubscribe()))
            .into_future();
        tokio::pin!(serve);

        let drain = async move {
            wait_for_shutdown(shutdown).await;
            tracing::info!(in_flight = connections.active_count(), "Draining requests");
            let drained = connections.drain(grace).await;
            if !drained {
                tracing::warn!(
                    in_flight = connections.active_count(),
                    "Grace period elapsed, abandoning in-flight requests"
                );
            }
            drained
        };

        tokio::select! {
            result = &mut serve => result?,
            drained = drain => {
                if drained {
                    // Idle keep-alive connections close right after the last response.
                    if let Ok(result) = tokio::time::timeout(Duration::from_secs(1), &mut serve).await {
                        result?;
                    }
                }
            }
        }

        Self::stop_background(background).await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` with the certificate pair from `listener.tls`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        cert_path: &std::path::Path,
        key_path: &std::path::Path,
        config_updates: mpsc::UnboundedReceiver<TitanConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let tls = load_tls_config(cert_path, key_path).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        let background = self.spawn_background(config_updates, &shutdown).await?;
        let grace = self.grace_period();

        let handle = axum_server::Handle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            wait_for_shutdown(shutdown).await;
            stopper.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        Self::stop_background(background).await;
        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn grace_period(&self) -> Duration {
        Duration::from_secs(self.state.inner.load().config.timeouts.shutdown_grace_secs)
    }

    async fn spawn_background(
        &self,
        mut config_updates: mpsc::UnboundedReceiver<TitanConfig>,
        shutdown: &broadcast::Receiver<()>,
    ) -> Result<Vec<JoinHandle<()>>, ServerError> {
        let mut tasks = Vec::new();

        let state = self.state.clone();
        let mut stop = shutdown.resubscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => state.apply_config(config),
                        None => break,
                    },
                    _ = stop.recv() => break,
                }
            }
        }));

        tasks.push(tokio::spawn(
            Janitor::new(self.state.clone()).run(shutdown.resubscribe()),
        ));

        let admin_config = self.state.inner.load().config.admin.clone();
        if admin_config.enabled {
            let addr: SocketAddr = admin_config
                .bind_address
                .parse()
                .map_err(|_| ServerError::AdminAddress(admin_config.bind_address.clone()))?;
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %addr, "Admin API listening");

            let app = admin::setup_admin_router(self.state.clone());
            let stop = shutdown.resubscribe();
            tasks.push(tokio::spawn(async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(wait_for_shutdown(stop))
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API stopped with error");
                }
            }));
        }

        Ok(tasks)
    }

    async fn stop_background(tasks: Vec<JoinHandle<()>>) {
        for task in tasks {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Background task panicked"),
                Err(_) => tracing::warn!("Background task did not stop in time"),
            }
        }
    }
}

/// Counts every request, including ones refused by the firewall.
async fn track_request(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    state.stats.record_request();

    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
