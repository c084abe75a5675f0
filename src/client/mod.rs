//! Procedure router client.
//!
//! This module turns typed procedure calls into HTTP requests and normalizes
//! every outcome into [`ClientError`](crate::ClientError):
//!
//! - **Queries** (`GET`) and **mutations** (`POST`) return a
//!   [`CancellableRequest`]
//! - **Subscriptions** (`PATCH` polls) run as a background loop with
//!   reconnect-on-408 and exponential backoff, returning a [`Subscription`]
//! - Pluggable [`HttpTransport`], abort signals, transformer and global hooks
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config       - ClientConfig
//! ├── request      - procedure → HTTP intent
//! ├── transport    - HttpTransport seam, reqwest default, abort factory
//! ├── executor     - one exchange, classified, hooks fired
//! ├── cancellable  - CancellableRequest and its state machine
//! ├── subscription - polling loop with reconnect and backoff
//! ├── fetch        - Client and ClientBuilder
//! └── utils        - backoff math
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Caller-facing client |
//! | [`ClientBuilder`] | Binds transport, transformer, headers and hooks |
//! | [`ClientConfig`] | Serializable settings |
//! | [`CancellableRequest`] | In-flight call with `cancel()` |
//! | [`Subscription`] | Running poll loop with `unsubscribe()` |
//!
//! # Examples
//!
//! ```
//! use rpc_router_client::client::{build_request, retry_delay};
//! use rpc_router_client::{IdentityTransformer, Procedure};
//! use serde_json::json;
//! use std::time::Duration;
//! use url::Url;
//!
//! let base = Url::parse("http://localhost:4000/rpc").unwrap();
//! let intent = build_request(
//!     &base,
//!     &Procedure::query("getUser", Some(json!({"id": 1}))),
//!     &IdentityTransformer,
//! )
//! .unwrap();
//! assert_eq!(intent.method, http::Method::GET);
//! assert_eq!(intent.url.path(), "/rpc/getUser");
//!
//! assert_eq!(retry_delay(3, 1000, 30_000), Duration::from_secs(8));
//! ```

mod cancellable;
mod config;
mod executor;
mod fetch;
mod request;
mod subscription;
mod transport;
mod utils;

pub use cancellable::{CancelHandle, CancellableRequest, RequestState};
pub use config::ClientConfig;
pub use executor::{CallOutcome, ErrorHook, HeaderSupplier, SuccessHook};
pub use fetch::{Client, ClientBuilder};
pub use request::{build_request, HttpIntent};
pub use subscription::{
    DataCallback, ErrorCallback, LoopPhase, NextInput, Subscription, SubscriptionOptions,
};
pub use transport::{
    AbortFactory, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TokenAbortFactory,
};
pub use utils::*;
