//! Transport seam and abort signals.
//!
//! The client never talks to the network directly. It hands an [`HttpRequest`]
//! to an [`HttpTransport`] and reads back an [`HttpResponse`]. The default
//! [`ReqwestTransport`] is built from [`ClientConfig`]; tests and embedders can
//! inject their own.
//!
//! Cancellation uses [`CancellationToken`]s produced by an [`AbortFactory`].
//! The executor races the transport future against the token, so transports
//! do not need to observe the token themselves: losing the race drops the
//! in-flight future, which closes the connection.

use crate::client::config::ClientConfig;
use crate::error::{BuildError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A fully assembled request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Target URL including any query string.
    pub url: Url,
    /// Headers to send.
    pub headers: HeaderMap,
    /// Body bytes, if any.
    pub body: Option<Bytes>,
}

/// A raw response. The status is informational; the envelope in `body`
/// decides success or failure.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and read the whole response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Produces one fresh abort signal per request.
pub trait AbortFactory: Send + Sync {
    /// A new, un-cancelled token.
    fn create(&self) -> CancellationToken;
}

/// Default abort factory: plain tokio-util tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenAbortFactory;

impl AbortFactory for TokenAbortFactory {
    fn create(&self) -> CancellationToken {
        CancellationToken::new()
    }
}

/// Default transport backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honoring the timeout, pool and proxy settings.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BuildError> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_idle_connections as usize);

        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| BuildError::Transport(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| BuildError::Transport(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req_builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_default_config() {
        let transport = ReqwestTransport::from_config(&ClientConfig::default());
        assert!(transport.is_ok());
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let config = ClientConfig {
            proxy_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ReqwestTransport::from_config(&config),
            Err(BuildError::Transport(_))
        ));
    }

    #[test]
    fn test_token_factory_creates_fresh_tokens() {
        let factory = TokenAbortFactory;
        let first = factory.create();
        first.cancel();
        assert!(!factory.create().is_cancelled());
    }
}
