//! Procedure descriptors.

use crate::error::ParseKindError;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The three procedure kinds a router exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Read-only call, sent as `GET`.
    Query,
    /// State-changing call, sent as `POST`.
    Mutation,
    /// One poll of a subscription, sent as `PATCH` so routers can tell it
    /// apart from a mutation.
    Subscription,
}

impl ProcedureKind {
    /// HTTP method used on the wire.
    pub fn method(self) -> Method {
        match self {
            ProcedureKind::Query => Method::GET,
            ProcedureKind::Mutation => Method::POST,
            ProcedureKind::Subscription => Method::PATCH,
        }
    }

    /// Lowercase name, as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
            ProcedureKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcedureKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(ProcedureKind::Query),
            "mutation" => Ok(ProcedureKind::Mutation),
            "subscription" => Ok(ProcedureKind::Subscription),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// One call: which kind, which procedure, with what input.
///
/// `input: None` means "no input at all", which is not the same as JSON
/// `null`: a query without input sends no `input` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    /// Kind of call.
    pub kind: ProcedureKind,
    /// Procedure path, e.g. `"users.get"`.
    pub path: String,
    /// Input before transformation.
    pub input: Option<Value>,
}

impl Procedure {
    /// Create a descriptor.
    pub fn new(kind: ProcedureKind, path: impl Into<String>, input: Option<Value>) -> Self {
        Procedure {
            kind,
            path: path.into(),
            input,
        }
    }

    /// A query descriptor.
    pub fn query(path: impl Into<String>, input: Option<Value>) -> Self {
        Self::new(ProcedureKind::Query, path, input)
    }

    /// A mutation descriptor.
    pub fn mutation(path: impl Into<String>, input: Option<Value>) -> Self {
        Self::new(ProcedureKind::Mutation, path, input)
    }

    /// A subscription poll descriptor.
    pub fn subscription(path: impl Into<String>, input: Option<Value>) -> Self {
        Self::new(ProcedureKind::Subscription, path, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_methods() {
        assert_eq!(ProcedureKind::Query.method(), Method::GET);
        assert_eq!(ProcedureKind::Mutation.method(), Method::POST);
        assert_eq!(ProcedureKind::Subscription.method(), Method::PATCH);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("query".parse::<ProcedureKind>(), Ok(ProcedureKind::Query));
        assert_eq!(
            "subscription".parse::<ProcedureKind>(),
            Ok(ProcedureKind::Subscription)
        );
        assert_eq!(
            "delete".parse::<ProcedureKind>(),
            Err(ParseKindError("delete".to_string()))
        );
    }

    #[test]
    fn test_kind_display_matches_parse() {
        for kind in [
            ProcedureKind::Query,
            ProcedureKind::Mutation,
            ProcedureKind::Subscription,
        ] {
            assert_eq!(kind.to_string().parse::<ProcedureKind>(), Ok(kind));
        }
    }
}
