//! HTTP ingress balancer.
//!
//! Spreads inbound requests across a fixed set of backends in round-robin
//! order, rejects clients that exceed their token bucket, and drops backends
//! from rotation when their health probe fails.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
