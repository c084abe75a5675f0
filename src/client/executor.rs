//! Request executor: one HTTP exchange, classified.
//!
//! [`RequestExecutor::execute`] never fails across its own boundary in the
//! sense of panicking or leaking a foreign error type: every path ends in a
//! [`CallOutcome`], which is then turned into `Result<Value, ClientError>`
//! after the global hooks have seen it.
//!
//! # Flow
//!
//! 1. Build the HTTP intent ([`build_request`]) and attach headers.
//! 2. Send it, racing the abort signal if one exists.
//! 3. Parse the body as JSON, run `transformer.deserialize`, decode the envelope.
//!    Any failure up to here is transport-origin.
//! 4. Settle the request lifecycle. A request cancelled before this point is
//!    reported as aborted, whatever the server said.
//! 5. Fire exactly one hook: `on_success` with the envelope, or `on_error` with
//!    the final [`ClientError`].
//!
//! Hooks run on the request task. They must not be used for control flow, and
//! a panicking hook is re-raised in whoever awaits the request.

use crate::client::cancellable::RequestLifecycle;
use crate::client::request::build_request;
use crate::client::transport::{AbortFactory, HttpRequest, HttpTransport};
use crate::error::{ClientError, Result, TransportError};
use crate::protocol::{request_headers, ErrorShape, ResponseEnvelope};
use crate::transformer::Transformer;
use crate::types::Procedure;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Supplies extra headers for every request.
pub type HeaderSupplier = Arc<dyn Fn() -> HeaderMap + Send + Sync>;

/// Called with the envelope of every successful call.
pub type SuccessHook = Arc<dyn Fn(&ResponseEnvelope) + Send + Sync>;

/// Called with the error of every failed call.
pub type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Classified result of one exchange.
#[derive(Debug)]
pub enum CallOutcome {
    /// Success envelope; carries `data`.
    Success(Value),
    /// No usable envelope.
    Transport(TransportError),
    /// Failure envelope.
    Envelope {
        /// The envelope's `error` field.
        shape: ErrorShape,
        /// The whole envelope.
        raw: Value,
    },
}

impl CallOutcome {
    /// Convert into the caller-facing result.
    pub fn into_result(self) -> Result<Value> {
        match self {
            CallOutcome::Success(data) => Ok(data),
            CallOutcome::Transport(source) => Err(ClientError::Transport { source }),
            CallOutcome::Envelope { shape, raw } => Err(ClientError::from_envelope(shape, raw)),
        }
    }
}

/// Everything needed to run calls, shared by all requests of one client.
pub(crate) struct RequestExecutor {
    pub(crate) base_url: Url,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) transformer: Arc<dyn Transformer>,
    pub(crate) abort_factory: Option<Arc<dyn AbortFactory>>,
    pub(crate) headers: Option<HeaderSupplier>,
    pub(crate) on_success: Option<SuccessHook>,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) enable_logging: bool,
    /// Correlation ids for log lines. Owned per client, never reset.
    pub(crate) call_counter: AtomicU64,
}

impl RequestExecutor {
    /// A fresh abort signal, or `None` when cancellation is not configured.
    pub(crate) fn new_signal(&self) -> Option<CancellationToken> {
        self.abort_factory.as_ref().map(|factory| factory.create())
    }

    /// Run `procedure` to completion under `lifecycle`.
    pub(crate) async fn execute(
        &self,
        procedure: &Procedure,
        lifecycle: &RequestLifecycle,
    ) -> Result<Value> {
        let call_id = self.call_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        if self.enable_logging {
            tracing::debug!(
                call_id,
                kind = %procedure.kind,
                path = %procedure.path,
                input = ?procedure.input,
                ">> {} #{} {}",
                procedure.kind,
                call_id,
                procedure.path
            );
        }

        let outcome = self.exchange(procedure, lifecycle.signal()).await;
        let outcome = if lifecycle.settle() {
            outcome
        } else {
            CallOutcome::Transport(TransportError::Aborted)
        };

        let result = self.notify(outcome);

        if self.enable_logging {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(data) => tracing::debug!(
                    call_id,
                    elapsed_ms,
                    output = ?data,
                    "<< {} #{} {} ok",
                    procedure.kind,
                    call_id,
                    procedure.path
                ),
                Err(err) => tracing::warn!(
                    call_id,
                    elapsed_ms,
                    aborted = err.is_aborted(),
                    "<< {} #{} {} failed: {}",
                    procedure.kind,
                    call_id,
                    procedure.path,
                    err
                ),
            }
        }

        result
    }

    /// Steps 1-3: build, send, classify.
    async fn exchange(
        &self,
        procedure: &Procedure,
        signal: Option<&CancellationToken>,
    ) -> CallOutcome {
        let intent = match build_request(&self.base_url, procedure, self.transformer.as_ref()) {
            Ok(intent) => intent,
            Err(err) => return CallOutcome::Transport(err),
        };

        let extra = self.headers.as_ref().map(|supply| supply()).unwrap_or_default();
        let request = HttpRequest {
            method: intent.method,
            url: intent.url,
            headers: request_headers(extra),
            body: intent.body,
        };

        let sent = match signal {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(TransportError::Aborted),
                    response = self.transport.send(request) => response,
                }
            }
            None => self.transport.send(request).await,
        };

        match sent {
            Ok(response) => self.classify(&response.body),
            Err(err) => CallOutcome::Transport(err),
        }
    }

    /// Decode a response body into an outcome.
    pub(crate) fn classify(&self, body: &[u8]) -> CallOutcome {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => return CallOutcome::Transport(err.into()),
        };
        let value = match self.transformer.deserialize(parsed) {
            Ok(value) => value,
            Err(err) => return CallOutcome::Transport(err.into()),
        };
        match ResponseEnvelope::deserialize(&value) {
            Ok(ResponseEnvelope::Success { data }) => CallOutcome::Success(data),
            Ok(ResponseEnvelope::Failure { error }) => CallOutcome::Envelope {
                shape: error,
                raw: value,
            },
            Err(err) => CallOutcome::Transport(err.into()),
        }
    }

    /// Step 5: fire at most one hook and produce the caller-facing result.
    fn notify(&self, outcome: CallOutcome) -> Result<Value> {
        let result = outcome.into_result();
        match &result {
            Ok(data) => {
                if let Some(hook) = &self.on_success {
                    hook(&ResponseEnvelope::success(data.clone()));
                }
            }
            Err(err) => {
                if let Some(hook) = &self.on_error {
                    hook(err);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::HttpResponse;
    use crate::transformer::tests::TaggingTransformer;
    use crate::transformer::IdentityTransformer;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct FixedTransport {
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.seen.lock().push(request);
            Ok(HttpResponse {
                status: 200,
                body: bytes::Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl HttpTransport for FailingTransport {
        async fn send(&self, _request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            Err(TransportError::Http("connection refused".into()))
        }
    }

    struct Counters {
        successes: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    }

    fn executor(transport: Arc<dyn HttpTransport>) -> (RequestExecutor, Counters) {
        let successes = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let s = successes.clone();
        let e = errors.clone();
        let executor = RequestExecutor {
            base_url: Url::parse("http://localhost/rpc").unwrap(),
            transport,
            transformer: Arc::new(IdentityTransformer),
            abort_factory: None,
            headers: Some(Arc::new(|| {
                let mut headers = HeaderMap::new();
                headers.insert("x-client", "tests".parse().unwrap());
                headers
            })),
            on_success: Some(Arc::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })),
            on_error: Some(Arc::new(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            })),
            enable_logging: true,
            call_counter: AtomicU64::new(0),
        };
        (executor, Counters { successes, errors })
    }

    fn fixed(body: &'static str) -> Arc<FixedTransport> {
        Arc::new(FixedTransport {
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_success_fires_success_hook_only() {
        let transport = fixed(r#"{"ok":true,"data":{"id":1,"name":"A"}}"#);
        let (executor, counters) = executor(transport.clone());
        let lifecycle = RequestLifecycle::new(None);

        let data = executor
            .execute(&Procedure::query("getUser", Some(json!({"id": 1}))), &lifecycle)
            .await
            .unwrap();

        assert_eq!(data, json!({"id": 1, "name": "A"}));
        assert_eq!(counters.successes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 0);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].headers["content-type"], "application/json");
        assert_eq!(seen[0].headers["x-client"], "tests");
    }

    #[tokio::test]
    async fn test_failure_envelope_fires_error_hook_only() {
        let transport = fixed(r#"{"ok":false,"error":{"message":"conflict","statusCode":409}}"#);
        let (executor, counters) = executor(transport);
        let lifecycle = RequestLifecycle::new(None);

        let err = executor
            .execute(&Procedure::mutation("createUser", Some(json!({"name": "B"}))), &lifecycle)
            .await
            .unwrap_err();

        assert_eq!(err.message(), "conflict");
        assert_eq!(err.status_code(), Some(409));
        assert!(err.envelope().is_some());
        assert_eq!(counters.successes.load(Ordering::SeqCst), 0);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transport_origin() {
        let (executor, counters) = executor(Arc::new(FailingTransport));
        let lifecycle = RequestLifecycle::new(None);

        let err = executor
            .execute(&Procedure::query("getUser", None), &lifecycle)
            .await
            .unwrap_err();

        assert!(err.shape().is_none());
        assert!(matches!(err.transport(), Some(TransportError::Http(_))));
        assert_eq!(counters.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_classify_malformed_body() {
        let (executor, _) = executor(Arc::new(FailingTransport));
        assert!(matches!(
            executor.classify(b"<html>bad gateway</html>"),
            CallOutcome::Transport(TransportError::Decode(_))
        ));
        assert!(matches!(
            executor.classify(br#"{"data": 1}"#),
            CallOutcome::Transport(TransportError::Decode(_))
        ));
    }

    #[test]
    fn test_classify_applies_transformer() {
        let (mut executor, _) = executor(Arc::new(FailingTransport));
        executor.transformer = Arc::new(TaggingTransformer);
        match executor.classify(br#"{"ok":true,"data":{"$v":[1,2,3]}}"#) {
            CallOutcome::Success(data) => assert_eq!(data, json!([1, 2, 3])),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_call_counter_is_per_executor() {
        let (first, _) = executor(Arc::new(FailingTransport));
        let (second, _) = executor(Arc::new(FailingTransport));
        first.call_counter.fetch_add(5, Ordering::Relaxed);
        assert_eq!(second.call_counter.load(Ordering::Relaxed), 0);
    }
}
