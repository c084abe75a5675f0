//! Cancellable requests.
//!
//! A [`CancellableRequest`] is an eagerly started call that can be awaited
//! like any future and cancelled at any time before it settles.
//!
//! # State Machine
//!
//! ```text
//!            cancel()               settle
//! Pending ───────────▶ Aborting ───────────▶ Cancelled
//!    │
//!    │ settle
//!    ▼
//! Settled   (cancel() is a no-op from here on)
//! ```
//!
//! The transition out of `Pending` happens under one lock, so a cancel racing
//! with settlement either wins (the call rejects as aborted and the signal is
//! raised once) or loses (the signal is never raised).
//!
//! Without an abort factory there is no signal to raise and `cancel()` does
//! nothing at all; the request simply runs to completion.

use crate::client::executor::RequestExecutor;
use crate::error::{ClientError, Result, TransportError};
use crate::types::Procedure;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// In flight, not cancelled.
    Pending,
    /// Cancel requested, signal raised, waiting for the task to observe it.
    Aborting,
    /// Settled normally with data or an error.
    Settled,
    /// Settled after a cancel; always rejects as aborted.
    Cancelled,
}

impl RequestState {
    /// Whether the request has produced its final result.
    pub fn is_settled(self) -> bool {
        matches!(self, RequestState::Settled | RequestState::Cancelled)
    }

    /// Whether `cancel()` took effect.
    pub fn is_aborted(self) -> bool {
        matches!(self, RequestState::Aborting | RequestState::Cancelled)
    }
}

/// Shared between the request task and every cancel handle.
#[derive(Debug)]
pub(crate) struct RequestLifecycle {
    state: Mutex<RequestState>,
    signal: Option<CancellationToken>,
}

impl RequestLifecycle {
    pub(crate) fn new(signal: Option<CancellationToken>) -> Self {
        RequestLifecycle {
            state: Mutex::new(RequestState::Pending),
            signal,
        }
    }

    pub(crate) fn signal(&self) -> Option<&CancellationToken> {
        self.signal.as_ref()
    }

    pub(crate) fn state(&self) -> RequestState {
        *self.state.lock()
    }

    /// Raise the abort signal if still pending. Returns whether it was raised.
    pub(crate) fn cancel(&self) -> bool {
        let Some(signal) = &self.signal else {
            return false;
        };
        let mut state = self.state.lock();
        if *state != RequestState::Pending {
            return false;
        }
        *state = RequestState::Aborting;
        signal.cancel();
        true
    }

    /// Mark the request settled. Returns `false` when a cancel got there first,
    /// in which case the result must be discarded in favor of an abort error.
    pub(crate) fn settle(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            RequestState::Pending => {
                *state = RequestState::Settled;
                true
            }
            RequestState::Aborting => {
                *state = RequestState::Cancelled;
                false
            }
            RequestState::Settled | RequestState::Cancelled => false,
        }
    }
}

/// A cloneable handle that cancels one request.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    lifecycle: Arc<RequestLifecycle>,
}

impl CancelHandle {
    pub(crate) fn from_lifecycle(lifecycle: Arc<RequestLifecycle>) -> Self {
        CancelHandle { lifecycle }
    }

    /// Cancel the request if it has not settled yet. Idempotent.
    pub fn cancel(&self) {
        self.lifecycle.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.lifecycle.state()
    }
}

/// An in-flight call that resolves to the procedure output.
///
/// The request starts as soon as it is created; awaiting it only collects the
/// result. Dropping it detaches the call without cancelling it.
///
/// # Examples
///
/// ```ignore
/// let request = client.query("getUser", Some(json!({"id": 1})));
/// let cancel = request.canceller();
/// tokio::spawn(async move {
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     cancel.cancel();
/// });
/// match request.await {
///     Ok(user) => println!("{user}"),
///     Err(e) if e.is_aborted() => println!("timed out"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug)]
pub struct CancellableRequest {
    task: JoinHandle<Result<Value>>,
    lifecycle: Arc<RequestLifecycle>,
}

impl CancellableRequest {
    /// Start `procedure` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub(crate) fn spawn(executor: Arc<RequestExecutor>, procedure: Procedure) -> Self {
        let lifecycle = Arc::new(RequestLifecycle::new(executor.new_signal()));
        let task_lifecycle = lifecycle.clone();
        let task = tokio::spawn(async move { executor.execute(&procedure, &task_lifecycle).await });
        CancellableRequest { task, lifecycle }
    }

    /// Cancel the request if it has not settled yet. Idempotent.
    pub fn cancel(&self) {
        self.lifecycle.cancel();
    }

    /// A handle that can cancel this request from elsewhere.
    pub fn canceller(&self) -> CancelHandle {
        CancelHandle::from_lifecycle(self.lifecycle.clone())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.lifecycle.state()
    }

    /// Whether the request has settled.
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// Whether `cancel()` took effect.
    pub fn is_aborted(&self) -> bool {
        self.state().is_aborted()
    }

    /// Await the result and deserialize it into `T`.
    ///
    /// A result that does not fit `T` fails with [`TransportError::Decode`];
    /// envelope errors and aborts pass through unchanged.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct User { id: u64, name: String }
    ///
    /// let user: User = client.query("getUser", Some(json!({"id": 1}))).decode().await?;
    /// ```
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T> {
        let data = self.await?;
        serde_json::from_value(data).map_err(|e| ClientError::from(TransportError::Decode(e)))
    }
}

impl Future for CancellableRequest {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.task).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Poll::Ready(Err(TransportError::Task(err.to_string()).into())),
        }
    }
}
