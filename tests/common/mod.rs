//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ingress_balancer::config::ProxyConfig;
use ingress_balancer::http::HttpServer;
use ingress_balancer::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Read the request head (up to the blank line) from a socket.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        204 => "204 No Content",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn respond(socket: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend whose reply is computed from the request head.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let (status, body) = f(&head);
                respond(&mut socket, status, &body).await;
            });
        }
    });

    addr
}

/// Start a backend that notes when each request arrives and answers 200
/// after `delay`.
pub async fn start_slow_backend(delay: Duration, arrivals: Arc<Mutex<Vec<Instant>>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let arrivals = arrivals.clone();
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                arrivals.lock().unwrap().push(Instant::now());
                tokio::time::sleep(delay).await;
                respond(&mut socket, 200, "").await;
            });
        }
    });

    addr
}

/// Start a backend that always answers 200 with a fixed body.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| (200, body.to_string())).await
}

/// Start a backend that answers 200 with the request head it received.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|head| (200, head.to_string())).await
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub server_pool: Arc<ingress_balancer::load_balancer::BackendPool>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop the proxy and wait for it and its background tasks to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("proxy did not shut down")
            .unwrap()
            .unwrap();
    }
}

/// Start the balancer on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    start_proxy_with(config, |_| {}).await
}

/// Start the balancer, letting `prepare` adjust the server before it runs.
pub async fn start_proxy_with<F>(config: ProxyConfig, prepare: F) -> RunningProxy
where
    F: FnOnce(&HttpServer),
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    prepare(&server);
    let server_pool = server.pool();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    RunningProxy {
        addr,
        server_pool,
        shutdown,
        handle,
    }
}

/// Config with the given backends, a generous rate limit and slow probes.
pub fn config_for(backends: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backends = backends.iter().map(|a| format!("http://{a}")).collect();
    config.rate_limit.capacity = 1_000;
    config.rate_limit.rate = 1_000;
    config.health_check.interval = Duration::from_secs(3600);
    config
}

/// HTTP client without connection reuse or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
