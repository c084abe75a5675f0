//! The caller-facing client.
//!
//! # Examples
//!
//! ## Queries and mutations
//!
//! ```ignore
//! use rpc_router_client::Client;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("http://localhost:4000/rpc").build()?;
//!
//!     let user = client.query("getUser", Some(json!({"id": 1}))).await?;
//!     println!("user: {user}");
//!
//!     match client.mutation("createUser", Some(json!({"name": "B"}))).await {
//!         Ok(created) => println!("created: {created}"),
//!         Err(e) => eprintln!("{} (status {:?})", e.message(), e.status_code()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Subscriptions
//!
//! ```ignore
//! use rpc_router_client::{Client, SubscriptionOptions};
//! use serde_json::{json, Value};
//!
//! let client = Client::builder("http://localhost:4000/rpc").build()?;
//! let subscription = client.subscription(
//!     "messages.poll",
//!     SubscriptionOptions::new(json!(0), |batch: &Value| {
//!         batch["cursor"].as_u64().map(|c| json!(c))
//!     })
//!     .on_data(|batch| println!("{batch}"))
//!     .on_error(|e| eprintln!("poll failed: {e}")),
//! );
//!
//! // later
//! subscription.unsubscribe();
//! ```

use crate::client::cancellable::CancellableRequest;
use crate::client::config::ClientConfig;
use crate::client::executor::{ErrorHook, HeaderSupplier, RequestExecutor, SuccessHook};
use crate::client::subscription::{
    spawn_subscription, subscription_once, LoopShared, RetryPolicy, Subscription,
    SubscriptionOptions,
};
use crate::client::transport::{AbortFactory, HttpTransport, ReqwestTransport, TokenAbortFactory};
use crate::error::{BuildError, ClientError, Result, TransportError};
use crate::protocol::ResponseEnvelope;
use crate::transformer::{IdentityTransformer, Transformer};
use crate::types::Procedure;
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use url::Url;

/// Client for a procedure router.
///
/// Cheap to clone; clones share the transport, hooks and log counter.
///
/// All call methods start work on the current tokio runtime and panic if
/// there is none.
#[derive(Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Start configuring a client for the router at `url`.
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(ClientConfig::new(url))
    }

    /// Build a client from a config with default collaborators.
    pub fn with_config(config: ClientConfig) -> std::result::Result<Self, BuildError> {
        ClientBuilder::new(config).build()
    }

    /// Call a query procedure (`GET`).
    ///
    /// The input travels JSON-encoded in the `input` query parameter and is
    /// omitted entirely when `None`.
    ///
    /// # Arguments
    ///
    /// * `path` - Procedure path, appended to the base URL after a `/`
    /// * `input` - Optional procedure input, passed through the transformer
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let user = client.query("getUser", Some(json!({"id": 1}))).await?;
    /// ```
    pub fn query(&self, path: impl Into<String>, input: Option<Value>) -> CancellableRequest {
        self.request(Procedure::query(path, input))
    }

    /// Call a mutation procedure (`POST`).
    ///
    /// # Arguments
    ///
    /// * `path` - Procedure path, appended to the base URL after a `/`
    /// * `input` - Optional procedure input, sent as `{"input": ...}`
    pub fn mutation(&self, path: impl Into<String>, input: Option<Value>) -> CancellableRequest {
        self.request(Procedure::mutation(path, input))
    }

    /// Call a query with any serializable input.
    ///
    /// Fails up front with [`TransportError::Decode`] when `input` cannot be
    /// represented as JSON.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// #[derive(Serialize)]
    /// struct GetUser { id: u64 }
    ///
    /// let user: User = client.query_as("getUser", &GetUser { id: 1 })?.decode().await?;
    /// ```
    pub fn query_as<I: Serialize>(
        &self,
        path: impl Into<String>,
        input: &I,
    ) -> Result<CancellableRequest> {
        Ok(self.query(path, Some(to_input(input)?)))
    }

    /// Call a mutation with any serializable input.
    pub fn mutation_as<I: Serialize>(
        &self,
        path: impl Into<String>,
        input: &I,
    ) -> Result<CancellableRequest> {
        Ok(self.mutation(path, Some(to_input(input)?)))
    }

    /// Issue any procedure as a single cancellable request.
    pub fn request(&self, procedure: Procedure) -> CancellableRequest {
        CancellableRequest::spawn(self.executor.clone(), procedure)
    }

    /// Poll a subscription procedure until [`Subscription::unsubscribe`].
    ///
    /// Failures never reject anything; they reach `options.on_error` if set and
    /// are otherwise dropped.
    ///
    /// # Arguments
    ///
    /// * `path` - Subscription procedure path, polled with `PATCH`
    /// * `options` - Initial cursor, cursor advance and callbacks
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let subscription = client.subscription(
    ///     "messages.poll",
    ///     SubscriptionOptions::new(json!(0), |batch: &Value| batch["cursor"].as_u64().map(|c| json!(c)))
    ///         .on_data(|batch| println!("{batch}")),
    /// );
    /// // ...
    /// subscription.unsubscribe();
    /// subscription.join().await;
    /// ```
    pub fn subscription(
        &self,
        path: impl Into<String>,
        options: SubscriptionOptions,
    ) -> Subscription {
        spawn_subscription(self.executor.clone(), path.into(), options, self.retry_policy())
    }

    /// One subscription poll, transparently reissued while the router answers
    /// with the reconnect status. Any other failure is returned.
    ///
    /// # Arguments
    ///
    /// * `path` - Subscription procedure path, polled with `PATCH`
    /// * `input` - Cursor for this poll
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let batch = client.subscription_once("messages.poll", Some(json!(0))).await?;
    /// ```
    pub async fn subscription_once(
        &self,
        path: impl Into<String>,
        input: Option<Value>,
    ) -> Result<Value> {
        let path = path.into();
        let shared = LoopShared::new();
        subscription_once(&self.executor, &path, input, self.retry_policy(), &shared).await
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay_ms: self.config.retry_base_delay_ms,
            max_delay_ms: self.config.max_retry_delay_ms,
            reconnect_status: self.config.reconnect_status,
        }
    }
}

fn to_input<I: Serialize>(input: &I) -> Result<Value> {
    serde_json::to_value(input).map_err(|e| ClientError::from(TransportError::Decode(e)))
}

/// Builder for [`Client`].
///
/// ```
/// use rpc_router_client::Client;
/// use http::{HeaderMap, HeaderValue};
///
/// let client = Client::builder("http://localhost:4000/rpc")
///     .headers(|| {
///         let mut headers = HeaderMap::new();
///         headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
///         headers
///     })
///     .on_error(|e| eprintln!("call failed: {e}"))
///     .logging(false)
///     .build()
///     .unwrap();
/// assert!(!client.config().enable_logging);
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    transformer: Arc<dyn Transformer>,
    abort_factory: Option<Arc<dyn AbortFactory>>,
    headers: Option<HeaderSupplier>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
}

impl ClientBuilder {
    /// Start from an existing config.
    pub fn new(config: ClientConfig) -> Self {
        ClientBuilder {
            config,
            transport: None,
            transformer: Arc::new(IdentityTransformer),
            abort_factory: Some(Arc::new(TokenAbortFactory)),
            headers: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Replace the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom abort factory, or `None` to make `cancel()` a no-op.
    pub fn abort_factory(mut self, factory: Option<Arc<dyn AbortFactory>>) -> Self {
        self.abort_factory = factory;
        self
    }

    /// Set the data transformer (identity by default).
    pub fn transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    /// Supply extra headers, evaluated once per request.
    pub fn headers<F>(mut self, headers: F) -> Self
    where
        F: Fn() -> HeaderMap + Send + Sync + 'static,
    {
        self.headers = Some(Arc::new(headers));
        self
    }

    /// Global hook for every successful call.
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ResponseEnvelope) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Global hook for every failed call, subscription polls included.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Toggle request tracing.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Validate the URL and assemble the client.
    pub fn build(self) -> std::result::Result<Client, BuildError> {
        let base_url = Url::parse(&self.config.url).map_err(|source| BuildError::InvalidUrl {
            url: self.config.url.clone(),
            source,
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };

        let executor = RequestExecutor {
            base_url,
            transport,
            transformer: self.transformer,
            abort_factory: self.abort_factory,
            headers: self.headers,
            on_success: self.on_success,
            on_error: self.on_error,
            enable_logging: self.config.enable_logging,
            call_counter: AtomicU64::new(0),
        };

        Ok(Client {
            executor: Arc::new(executor),
            config: Arc::new(self.config),
        })
    }
}
