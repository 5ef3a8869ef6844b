//! Startup orchestration.
//!
//! Order: bind the listener, install metrics, arm signal handling, then
//! serve. Any failure before serving is fatal.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Error type for startup and serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the balancer described by a validated `config` until a termination
/// signal arrives.
pub async fn start(config: ProxyConfig) -> Result<(), StartupError> {
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr()?,
        backends = ?config.backends,
        capacity = config.rate_limit.capacity,
        rate = config.rate_limit.rate,
        health_interval = ?config.health_check.interval,
        health_path = %config.health_check.path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown).await?;
    Ok(())
}
