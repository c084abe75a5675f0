//! Request builder: procedure descriptor in, HTTP intent out.
//!
//! | Kind | Method | URL | Body |
//! |------|--------|-----|------|
//! | query | `GET` | `{base}/{path}?input={json}` | none |
//! | mutation | `POST` | `{base}/{path}` | `{"input": ...}` |
//! | subscription | `PATCH` | `{base}/{path}` | `{"input": ...}` |
//!
//! The query parameter is dropped entirely when the input is absent. For body
//! kinds an absent input yields `{}`.

use crate::error::TransportError;
use crate::protocol::{INPUT_BODY_FIELD, INPUT_QUERY_PARAM};
use crate::transformer::Transformer;
use crate::types::{Procedure, ProcedureKind};
use bytes::Bytes;
use http::Method;
use serde_json::{Map, Value};
use url::Url;

/// What to send for one procedure call, before headers are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpIntent {
    /// Verb derived from the procedure kind.
    pub method: Method,
    /// Full procedure URL.
    pub url: Url,
    /// JSON body for mutations and subscriptions.
    pub body: Option<Bytes>,
}

/// Map a procedure onto its HTTP intent.
///
/// The input is passed through `transformer.serialize` first; absent input is
/// not serialized.
pub fn build_request(
    base: &Url,
    procedure: &Procedure,
    transformer: &dyn Transformer,
) -> Result<HttpIntent, TransportError> {
    let mut url = procedure_url(base, &procedure.path)?;
    let input = procedure
        .input
        .clone()
        .map(|value| transformer.serialize(value))
        .transpose()?;

    let body = match procedure.kind {
        ProcedureKind::Query => {
            if let Some(input) = input {
                let encoded = serde_json::to_string(&input)?;
                url.query_pairs_mut()
                    .append_pair(INPUT_QUERY_PARAM, &encoded);
            }
            None
        }
        ProcedureKind::Mutation | ProcedureKind::Subscription => {
            let mut body = Map::new();
            if let Some(input) = input {
                body.insert(INPUT_BODY_FIELD.to_string(), input);
            }
            Some(Bytes::from(serde_json::to_vec(&Value::Object(body))?))
        }
    };

    Ok(HttpIntent {
        method: procedure.kind.method(),
        url,
        body,
    })
}

/// `base + "/" + path`, tolerating a trailing slash on the base.
fn procedure_url(base: &Url, path: &str) -> Result<Url, TransportError> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Ok(Url::parse(&joined)?)
}
