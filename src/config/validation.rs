//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend URLs and uniqueness
//! - Validate value ranges (capacity > 0, interval > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one backend is required")]
    NoBackends,
    #[error("backend {0:?} is not an absolute URL with a host")]
    InvalidBackendUrl(String),
    #[error("backend {0:?} is listed more than once")]
    DuplicateBackend(String),
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
    #[error("rate_limit.capacity must be at least 1")]
    ZeroCapacity,
    #[error("health_check.interval must be greater than zero")]
    ZeroInterval,
    #[error("health_check.path {0:?} must start with '/'")]
    InvalidHealthPath(String),
    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        let valid = Url::parse(backend)
            .map(|url| url.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidBackendUrl(backend.clone()));
        }
        if !seen.insert(backend.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.rate_limit.capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }

    if config.health_check.interval.is_zero() {
        errors.push(ValidationError::ZeroInterval);
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(
            config.health_check.path.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
