//! Client configuration.
//!
//! [`ClientConfig`] holds the plain, serializable settings. Collaborators that
//! are code rather than data (transport, transformer, hooks, header supplier)
//! are attached through [`ClientBuilder`](super::ClientBuilder).

use serde::{Deserialize, Serialize};

/// Settings for a [`Client`](super::Client).
///
/// Loadable from any serde format; missing fields fall back to
/// [`ClientConfig::default`].
///
/// ```
/// use rpc_router_client::client::ClientConfig;
///
/// let config: ClientConfig =
///     serde_json::from_str(r#"{"url": "http://localhost:4000/rpc", "max_retry_delay_ms": 5000}"#)
///         .unwrap();
/// assert_eq!(config.max_retry_delay_ms, 5000);
/// assert_eq!(config.retry_base_delay_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base endpoint; procedure paths are appended after a `/`.
    pub url: String,

    /// Per-request timeout of the default transport. `0`, the default, disables
    /// it. Long polls count against it too.
    pub request_timeout_ms: u64,

    /// Idle connections kept per host by the default transport.
    pub max_idle_connections: u32,

    /// Proxy for the default transport. Empty means none.
    pub proxy_url: String,

    /// Trace every request and result through `tracing`.
    pub enable_logging: bool,

    /// Base of the subscription backoff (`base * 2^attempt`).
    pub retry_base_delay_ms: u64,

    /// Upper bound of the subscription backoff.
    pub max_retry_delay_ms: u64,

    /// Failure-envelope status code treated as a reconnect directive.
    pub reconnect_status: u16,
}

impl ClientConfig {
    /// Default settings pointing at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: String::new(),
            request_timeout_ms: 0,
            max_idle_connections: 100,
            proxy_url: String::new(),
            enable_logging: cfg!(debug_assertions),
            retry_base_delay_ms: 1_000,
            max_retry_delay_ms: 30_000,
            reconnect_status: crate::protocol::RECONNECT_STATUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost/rpc");
        assert_eq!(config.url, "http://localhost/rpc");
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.max_retry_delay_ms, 30_000);
        assert_eq!(config.reconnect_status, 408);
        assert_eq!(config.enable_logging, cfg!(debug_assertions));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url": "http://x", "enable_logging": false}"#).unwrap();
        assert!(!config.enable_logging);
        assert_eq!(config.request_timeout_ms, 0);
    }

    #[test]
    fn test_default_has_no_request_timeout() {
        assert_eq!(ClientConfig::default().request_timeout_ms, 0);

        let config: ClientConfig =
            serde_json::from_str(r#"{"url": "http://x", "request_timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.request_timeout_ms, 5000);
    }
}
