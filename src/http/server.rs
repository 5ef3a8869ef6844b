//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Spawn the health monitor and rate limiter sweeper
//! - Serve until the shutdown signal, then drain

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::ExtensionRejection, ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::health::HealthMonitor;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::load_balancer::BackendPool;
use crate::security::RateLimiterRegistry;

/// HTTP server for the balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
    limiter: Arc<RateLimiterRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let pool = Arc::new(BackendPool::new(config.backends.iter().cloned()));
        let limiter = Arc::new(RateLimiterRegistry::from_config(&config.rate_limit));
        let dispatcher = Arc::new(Dispatcher::new(limiter.clone(), pool.clone()));

        Self {
            router: build_router(dispatcher),
            config,
            pool,
            limiter,
        }
    }

    /// Run the server, accepting connections on the given listener, until
    /// `shutdown` fires. Background tasks stop on the same signal.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
        let health_task = tokio::spawn(monitor.run(shutdown.subscribe()));

        let sweeper_task = tokio::spawn(self.limiter.clone().run_sweeper(
            self.config.rate_limit.sweep_interval,
            self.config.rate_limit.idle_timeout,
            shutdown.subscribe(),
        ));

        let mut server_shutdown = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await;

        // Covers the serve-error path; a no-op after a normal shutdown.
        shutdown.trigger();
        let _ = health_task.await;
        let _ = sweeper_task.await;

        tracing::info!("HTTP server stopped");
        result
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    pub fn limiter(&self) -> Arc<RateLimiterRegistry> {
        self.limiter.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/{*path}", any(dispatch_handler))
        .route("/", any(dispatch_handler))
        .with_state(dispatcher)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

/// Catch-all handler for every method and path.
///
/// A missing remote address is not rejected here; the dispatcher turns it
/// into its own 500.
async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    connect_info: Result<ConnectInfo<SocketAddr>, ExtensionRejection>,
    request: Request<Body>,
) -> Response {
    let remote = connect_info.ok().map(|ConnectInfo(addr)| addr);
    dispatcher.dispatch(remote, request).await
}
