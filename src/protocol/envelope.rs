//! The response envelope every procedure answers with.
//!
//! ```text
//! {"ok": true,  "data": <any>}
//! {"ok": false, "error": {"message": "...", "statusCode": 409, ...}}
//! ```
//!
//! `ok` is the discriminant. Serde cannot tag an enum on a boolean, so the
//! envelope goes through [`RawEnvelope`] and is validated on the way in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope", into = "RawEnvelope")]
pub enum ResponseEnvelope {
    /// `{"ok": true, "data": ...}`
    Success {
        /// Procedure output. `null` when the server omitted it.
        data: Value,
    },
    /// `{"ok": false, "error": ...}`
    Failure {
        /// Server-defined error payload.
        error: ErrorShape,
    },
}

impl ResponseEnvelope {
    /// Wrap successful output.
    pub fn success(data: Value) -> Self {
        ResponseEnvelope::Success { data }
    }

    /// Wrap a failure with a message and optional status code.
    pub fn failure(message: impl Into<String>, status_code: Option<u16>) -> Self {
        ResponseEnvelope::Failure {
            error: ErrorShape::new(message, status_code),
        }
    }

    /// The `ok` discriminant.
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }
}

/// Server-defined error payload carried by a failure envelope.
///
/// `message` and `statusCode` are the fields the client interprets; anything
/// else the router sends is kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    /// Human readable description.
    pub message: String,
    /// HTTP-like status code chosen by the router.
    #[serde(rename = "statusCode", default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Any other server fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorShape {
    /// Create a shape with no extra fields.
    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        ErrorShape {
            message: message.into(),
            status_code,
            extra: Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorShape>,
}

impl TryFrom<RawEnvelope> for ResponseEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if raw.ok {
            Ok(ResponseEnvelope::Success {
                data: raw.data.unwrap_or(Value::Null),
            })
        } else {
            raw.error
                .map(|error| ResponseEnvelope::Failure { error })
                .ok_or_else(|| "failure envelope without an error field".to_string())
        }
    }
}

impl From<ResponseEnvelope> for RawEnvelope {
    fn from(envelope: ResponseEnvelope) -> Self {
        match envelope {
            ResponseEnvelope::Success { data } => RawEnvelope {
                ok: true,
                data: Some(data),
                error: None,
            },
            ResponseEnvelope::Failure { error } => RawEnvelope {
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}
