//! Wire contract shared by every procedure call.
//!
//! | Kind | Method | Input |
//! |------|--------|-------|
//! | query | `GET` | `?input=<json>` (omitted when absent) |
//! | mutation | `POST` | body `{"input": ...}` |
//! | subscription | `PATCH` | body `{"input": ...}` |
//!
//! Every response body is a [`ResponseEnvelope`]. A failure envelope whose
//! `statusCode` is [`RECONNECT_STATUS`] tells a subscription poll to reissue
//! the same request immediately.

mod envelope;
mod headers;

pub use envelope::{ErrorShape, ResponseEnvelope};
pub use headers::{merge_headers, request_headers};

/// Query parameter carrying the JSON-encoded input of a query.
pub const INPUT_QUERY_PARAM: &str = "input";

/// Key of the input inside mutation and subscription bodies.
pub const INPUT_BODY_FIELD: &str = "input";

/// Content type of every request body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Envelope status code meaning "poll again now".
pub const RECONNECT_STATUS: u16 = 408;
