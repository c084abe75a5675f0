//! Request header assembly.
//!
//! Every call carries `content-type: application/json`. Headers supplied by the
//! caller's header callback are layered on top and win on conflict, so a caller
//! can still override the content type if their router expects something else.
//!
//! # Examples
//!
//! ```
//! use http::{HeaderMap, HeaderValue};
//! use rpc_router_client::protocol::request_headers;
//!
//! let mut extra = HeaderMap::new();
//! extra.insert("authorization", HeaderValue::from_static("Bearer abc"));
//!
//! let headers = request_headers(extra);
//! assert_eq!(headers["content-type"], "application/json");
//! assert_eq!(headers["authorization"], "Bearer abc");
//! ```

use super::JSON_CONTENT_TYPE;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

/// Build the header set for one request from the caller-supplied extras.
pub fn request_headers(extra: HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(extra.len() + 1);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    merge_headers(&mut headers, extra);
    headers
}

/// Copy `extra` into `base`, replacing every header name `extra` mentions.
///
/// Multi-valued headers in `extra` keep all of their values.
pub fn merge_headers(base: &mut HeaderMap, extra: HeaderMap) {
    let mut last_name = None;
    for (name, value) in extra {
        match name {
            Some(name) => {
                base.insert(name.clone(), value);
                last_name = Some(name);
            }
            None => {
                if let Some(name) = &last_name {
                    base.append(name.clone(), value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_always_present() {
        let headers = request_headers(HeaderMap::new());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_caller_headers_override() {
        let mut extra = HeaderMap::new();
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-custom"));
        let headers = request_headers(extra);
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "application/x-custom");
    }

    #[test]
    fn test_multi_valued_headers_kept() {
        let mut extra = HeaderMap::new();
        extra.append("x-trace", HeaderValue::from_static("a"));
        extra.append("x-trace", HeaderValue::from_static("b"));
        let headers = request_headers(extra);
        let values: Vec<_> = headers.get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}
