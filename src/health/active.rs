//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Overwrite backend liveness with each probe result

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode, Uri};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

const USER_AGENT: &str = "ingress-balancer-health-check";

pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            config,
            client,
        }
    }

    /// Probe every interval until shutdown. The first round runs one interval
    /// after start; until then every backend keeps its initial liveness.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.config.interval,
            path = %self.config.path,
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let interval = self.config.interval;
        if interval.is_zero() {
            tracing::warn!("Health check interval is zero, active probing disabled");
            return;
        }

        // Each round starts a full interval after the previous one finished.
        loop {
            tokio::select! {
                _ = time::sleep(interval) => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe round over every backend and record the results.
    pub async fn check_all(&self) {
        let probes = self
            .pool
            .backends()
            .iter()
            .map(|backend| async move { (backend, self.probe(backend).await) });

        for (backend, alive) in join_all(probes).await {
            let addr = backend.address();
            match self.pool.set_alive(addr, alive) {
                Some(previous) if previous != alive => {
                    if alive {
                        tracing::info!(backend = %addr, "Backend back in rotation");
                    } else {
                        tracing::warn!(backend = %addr, "Backend removed from rotation");
                    }
                }
                _ => {}
            }
            metrics::record_backend_health(addr, alive);
        }

        tracing::debug!(
            alive = self.pool.alive_count(),
            total = self.pool.len(),
            "Health check round complete"
        );
    }

    /// A backend is alive only if `GET address + path` answers exactly 200.
    async fn probe(&self, backend: &Backend) -> bool {
        let url = backend.probe_url(&self.config.path);

        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(backend = %backend.address(), url = %url, error = %e, "Health check failed: bad probe URL");
                return false;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(backend = %backend.address(), error = %e, "Failed to build health check request");
                return false;
            }
        };

        match self.client.request(request).await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                tracing::warn!(backend = %backend.address(), status = %response.status(), "Health check failed: non-200 status");
                false
            }
            Err(e) => {
                tracing::warn!(backend = %backend.address(), error = %e, "Health check failed: connection error");
                false
            }
        }
    }
}
