//! Error types for the router client.
//!
//! Every failed call settles with exactly one [`ClientError`]. Its two variants
//! mirror where the failure came from:
//!
//! | Variant | Origin | Carries |
//! |---------|--------|---------|
//! | [`ClientError::Transport`] | I/O, abort, unparseable body | the underlying [`TransportError`] |
//! | [`ClientError::Envelope`] | well-formed failure envelope | the server [`ErrorShape`] and raw envelope |
//!
//! Configuration problems surface earlier as [`BuildError`], and an unknown
//! procedure kind string is rejected by [`ParseKindError`] before any request
//! exists.

use crate::protocol::{ErrorShape, RECONNECT_STATUS};
use serde_json::Value;
use thiserror::Error;

/// The single error type surfaced to callers of `query`, `mutation` and the
/// subscription `on_error` hook.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The exchange failed before a response envelope could be read.
    #[error("{source}")]
    Transport {
        /// What went wrong on the way to an envelope.
        #[source]
        source: TransportError,
    },

    /// The server answered with `{"ok": false, "error": ...}`.
    #[error("{}", .shape.message)]
    Envelope {
        /// The server-defined error payload.
        shape: ErrorShape,
        /// The complete failure envelope as received (after deserialization).
        raw: Value,
    },
}

impl ClientError {
    /// Build an envelope-origin error.
    pub fn from_envelope(shape: ErrorShape, raw: Value) -> Self {
        ClientError::Envelope { shape, raw }
    }

    /// Human readable message. For envelope errors this is the server message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Transport { source } => source.to_string(),
            ClientError::Envelope { shape, .. } => shape.message.clone(),
        }
    }

    /// The server error payload, present only for envelope-origin errors.
    pub fn shape(&self) -> Option<&ErrorShape> {
        match self {
            ClientError::Envelope { shape, .. } => Some(shape),
            ClientError::Transport { .. } => None,
        }
    }

    /// The raw failure envelope, present only for envelope-origin errors.
    pub fn envelope(&self) -> Option<&Value> {
        match self {
            ClientError::Envelope { raw, .. } => Some(raw),
            ClientError::Transport { .. } => None,
        }
    }

    /// The underlying transport failure, present only for transport-origin errors.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ClientError::Transport { source } => Some(source),
            ClientError::Envelope { .. } => None,
        }
    }

    /// `statusCode` from the failure envelope, if the server sent one.
    pub fn status_code(&self) -> Option<u16> {
        self.shape().and_then(|shape| shape.status_code)
    }

    /// Whether the server asked a subscription poll to reconnect (HTTP 408 semantics).
    pub fn is_reconnect(&self) -> bool {
        self.is_reconnect_with(RECONNECT_STATUS)
    }

    /// Like [`ClientError::is_reconnect`] with a configurable status code.
    pub fn is_reconnect_with(&self, status: u16) -> bool {
        self.status_code() == Some(status)
    }

    /// Whether the request was cancelled before it settled.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            ClientError::Transport {
                source: TransportError::Aborted
            }
        )
    }
}

impl From<TransportError> for ClientError {
    fn from(source: TransportError) -> Self {
        ClientError::Transport { source }
    }
}

/// Failures that happen before a response envelope is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP exchange itself failed (connect, timeout, read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request was cancelled through its abort signal.
    #[error("request aborted")]
    Aborted,

    /// The body was not JSON, or not a valid response envelope.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The transformer rejected a value.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The procedure URL could not be formed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The task driving the request ended without producing a result.
    #[error("request task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

/// Raised by a [`Transformer`](crate::Transformer) that cannot convert a value.
#[derive(Debug, Error)]
#[error("transform failed: {0}")]
pub struct TransformError(pub String);

/// Problems detected while building a [`Client`](crate::Client).
#[derive(Debug, Error)]
pub enum BuildError {
    /// The base URL did not parse.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },

    /// The default reqwest transport could not be constructed.
    #[error("failed to build HTTP transport: {0}")]
    Transport(String),
}

/// An unrecognised procedure kind string.
///
/// This is a programming error: it is never wrapped in [`ClientError`] and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown procedure kind: {0:?}")]
pub struct ParseKindError(pub String);

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
