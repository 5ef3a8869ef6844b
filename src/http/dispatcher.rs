//! Per-request dispatch: admission, backend selection, forwarding.
//!
//! # Data Flow
//! ```text
//! remote address → client IP
//!     → RateLimiterRegistry::allow   (denied: 429)
//!     → BackendPool::next            (none alive: 503)
//!     → target URI from base URL     (malformed: 500)
//!     → hyper client                 (transport error: 502)
//!     → backend response, streamed back
//! ```
//!
//! A failed forward is reported to the client only. Liveness is owned by the
//! health monitor.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{Request, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::{Position, Url};

use crate::http::request::request_id;
use crate::http::response::DispatchError;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;
use crate::security::headers::{apply_forwarded, strip_hop_by_hop};
use crate::security::RateLimiterRegistry;

/// Entry point shared by every request task.
pub struct Dispatcher {
    limiter: Arc<RateLimiterRegistry>,
    pool: Arc<BackendPool>,
    client: Client<HttpConnector, Body>,
}

impl Dispatcher {
    pub fn new(limiter: Arc<RateLimiterRegistry>, pool: Arc<BackendPool>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            limiter,
            pool,
            client,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn limiter(&self) -> &Arc<RateLimiterRegistry> {
        &self.limiter
    }

    /// Handle one request end to end. Every outcome is a well-formed response.
    pub async fn dispatch(&self, remote: Option<SocketAddr>, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(&request);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        match self.try_dispatch(remote, request).await {
            Ok((backend, response)) => {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    backend = %backend,
                    status = %response.status(),
                    "Proxied request"
                );
                metrics::record_request(&method, response.status().as_u16(), &backend, start);
                response
            }
            Err(error) => {
                match &error {
                    DispatchError::RateLimited(client) => {
                        tracing::info!(request_id = %request_id, client = %client, "Rate limit exceeded");
                        metrics::record_rate_limited();
                    }
                    DispatchError::Upstream { backend, source } => {
                        tracing::error!(request_id = %request_id, backend = %backend, error = %source, "Upstream error");
                    }
                    other => {
                        tracing::error!(request_id = %request_id, method = %method, path = %path, error = %other, "Request rejected");
                    }
                }
                let response = error.into_response();
                metrics::record_request(&method, response.status().as_u16(), "none", start);
                response
            }
        }
    }

    async fn try_dispatch(
        &self,
        remote: Option<SocketAddr>,
        request: Request<Body>,
    ) -> Result<(String, Response), DispatchError> {
        let client_ip = client_identity(remote)?;
        let backend = self.admit(client_ip)?;
        let response = self.forward(&backend, client_ip, request).await?;
        Ok((backend.address().to_string(), response))
    }

    /// Rate limit, then pick a backend. The pool is not consulted for a
    /// denied client.
    pub fn admit(&self, client_ip: IpAddr) -> Result<Arc<Backend>, DispatchError> {
        let key = client_ip.to_string();
        if !self.limiter.allow(&key) {
            return Err(DispatchError::RateLimited(key));
        }
        self.pool.next().ok_or(DispatchError::NoBackends)
    }

    /// Forward `request` to `backend` and stream the response back.
    pub async fn forward(
        &self,
        backend: &Backend,
        client_ip: IpAddr,
        request: Request<Body>,
    ) -> Result<Response, DispatchError> {
        let bad_url = || DispatchError::BadBackendUrl(backend.address().to_string());
        let base = backend.base_url().ok_or_else(bad_url)?;

        let (mut parts, body) = request.into_parts();
        parts.uri = target_uri(base, &parts.uri).ok_or_else(bad_url)?;
        parts.version = Version::HTTP_11;
        apply_forwarded(&mut parts.headers, client_ip, authority(base));

        let outbound = Request::from_parts(parts, body);
        match self.client.request(outbound).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Err(source) => Err(DispatchError::Upstream {
                backend: backend.address().to_string(),
                source,
            }),
        }
    }
}

/// Client identity: the remote IP with the port dropped. IPv4-mapped IPv6
/// addresses are folded to IPv4 so one client has one bucket.
pub fn client_identity(remote: Option<SocketAddr>) -> Result<IpAddr, DispatchError> {
    remote
        .map(|addr| addr.ip().to_canonical())
        .ok_or(DispatchError::ClientAddress)
}

fn authority(base: &Url) -> &str {
    &base[Position::BeforeHost..Position::AfterPort]
}

/// Join the backend base URL with the inbound path and query.
///
/// The base path is a prefix (`http://b/api` + `/users` → `http://b/api/users`);
/// queries from both sides are concatenated.
pub fn target_uri(base: &Url, original: &Uri) -> Option<Uri> {
    let mut target = format!(
        "{}://{}{}{}",
        base.scheme(),
        authority(base),
        base.path().trim_end_matches('/'),
        original.path()
    );

    let query = match (base.query().filter(|q| !q.is_empty()), original.query()) {
        (Some(a), Some(b)) => Some(format!("{a}&{b}")),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };
    if let Some(query) = query {
        target.push('?');
        target.push_str(&query);
    }

    target.parse().ok()
}
