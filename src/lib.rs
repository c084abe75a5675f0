#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Procedure Router Client
//!
//! An HTTP client runtime for routers that expose named procedures of three
//! kinds: queries, mutations and subscriptions.
//!
//! ## Overview
//!
//! A call travels through four layers:
//!
//! 1. **Request building** - the procedure kind picks the verb (`GET`, `POST`,
//!    `PATCH`) and where the input goes (query string or JSON body)
//! 2. **Execution** - one HTTP exchange; the JSON response envelope decides
//!    success or failure, and every failure becomes a [`ClientError`]
//! 3. **Cancellation** - each call is a [`CancellableRequest`] whose `cancel()`
//!    raises an abort signal, safely, at most once, and never after settlement
//! 4. **Subscriptions** - a sequential polling loop that reconnects instantly on
//!    a 408 envelope and backs off exponentially (capped at 30s) on real errors
//!
//! ## Wire Format
//!
//! | Kind | Method | Input |
//! |------|--------|-------|
//! | query | `GET` | `?input=<json>` |
//! | mutation | `POST` | `{"input": ...}` |
//! | subscription | `PATCH` | `{"input": ...}` |
//!
//! Responses are `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": {"message": ..., "statusCode": ...}}`.
//!
//! ## Usage
//!
//! ```ignore
//! use rpc_router_client::{Client, SubscriptionOptions};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("http://localhost:4000/rpc")
//!         .on_error(|e| eprintln!("call failed: {e}"))
//!         .build()?;
//!
//!     let user = client.query("getUser", Some(json!({"id": 1}))).await?;
//!
//!     let subscription = client.subscription(
//!         "events.poll",
//!         SubscriptionOptions::new(json!(0), |events: &Value| {
//!             Some(json!(events.as_array().map_or(0, |e| e.len())))
//!         })
//!         .on_data(|events| println!("{events}")),
//!     );
//!     subscription.unsubscribe();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Procedure descriptors
//! - **[error]** - Error types and result handling
//! - **[protocol]** - Wire constants, response envelope, header assembly
//! - **[transformer]** - Input/output transformer hooks
//! - **[client]** - Client, cancellable requests, subscriptions, transport

pub mod client;
pub mod error;
pub mod protocol;
pub mod transformer;
pub mod types;

pub use client::{
    CancellableRequest, Client, ClientBuilder, ClientConfig, Subscription, SubscriptionOptions,
};
pub use error::{BuildError, ClientError, Result, TransportError};
pub use protocol::{ErrorShape, ResponseEnvelope};
pub use transformer::{IdentityTransformer, Transformer};
pub use types::{Procedure, ProcedureKind};
