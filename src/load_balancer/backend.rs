//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its configured base URL
//! - Pre-parse the base URL once for the forwarding path
//! - Build the probe URL for health checks

use url::Url;

/// A single backend server.
///
/// Identity is the address string exactly as configured. Liveness is not
/// stored here; it lives in the owning [`BackendPool`](super::pool::BackendPool)
/// so that flags and cursor share one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    address: String,
    /// Pre-calculated base URL. `None` when the address is malformed.
    base_url: Option<Url>,
}

impl Backend {
    /// Create a new backend from its base URL.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let base_url = Url::parse(&address).ok().filter(Url::has_host);
        if base_url.is_none() {
            tracing::warn!(address = %address, "Backend address is not a valid URL");
        }
        Self { address, base_url }
    }

    /// The configured address; identity of the backend.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The parsed base URL, if the address is well formed.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// URL probed by the health checker: address followed by `path`.
    pub fn probe_url(&self, path: &str) -> String {
        format!("{}{}", self.address.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_base_url() {
        let backend = Backend::new("http://127.0.0.1:9001");
        assert_eq!(backend.address(), "http://127.0.0.1:9001");
        let url = backend.base_url().unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(9001));
    }

    #[test]
    fn test_malformed_address_has_no_url() {
        assert!(Backend::new("::not a url::").base_url().is_none());
        assert!(Backend::new("mailto:ops@example.com").base_url().is_none());
    }

    #[test]
    fn test_probe_url() {
        assert_eq!(
            Backend::new("http://10.0.0.1:80").probe_url("/health"),
            "http://10.0.0.1:80/health"
        );
        assert_eq!(
            Backend::new("http://10.0.0.1:80/").probe_url("/health"),
            "http://10.0.0.1:80/health"
        );
    }
}
