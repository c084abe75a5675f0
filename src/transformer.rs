//! Data transformers.
//!
//! A transformer rewrites procedure inputs before they are JSON-encoded and
//! rewrites decoded response bodies before the envelope is inspected. Routers
//! use this to carry types JSON lacks (dates, big integers, sets) as tagged
//! values.
//!
//! Implementations must be pure and deterministic, and
//! `deserialize(serialize(x)) == x` must hold for every value the
//! application sends.

use crate::error::TransformError;
use serde_json::Value;

/// Serialize/deserialize hook pair applied around the wire format.
pub trait Transformer: Send + Sync {
    /// Applied to each input before it is encoded into a request.
    fn serialize(&self, value: Value) -> Result<Value, TransformError>;

    /// Applied to each decoded response body before envelope classification.
    fn deserialize(&self, value: Value) -> Result<Value, TransformError>;
}

/// The default transformer: values pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {
    fn serialize(&self, value: Value) -> Result<Value, TransformError> {
        Ok(value)
    }

    fn deserialize(&self, value: Value) -> Result<Value, TransformError> {
        Ok(value)
    }
}
