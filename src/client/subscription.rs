//! Polling subscriptions.
//!
//! A subscription is a sequence of discrete `PATCH` polls, not a stream. Each
//! poll carries a cursor input; each successful answer is handed to `on_data`
//! and turned into the next cursor by `next_input`.
//!
//! # Retry Tiers
//!
//! - **Reconnect**: a failure envelope with the reconnect status (408 by
//!   default) reissues the same poll immediately. No backoff, no limit, and the
//!   caller never sees it.
//! - **Backoff**: any other failure goes to `on_error`, bumps the attempt
//!   counter and retries the same input after
//!   `min(base * 2^attempt, cap)`. A success resets the counter to zero.
//!
//! The loop never gives up on its own. It ends only when
//! [`Subscription::unsubscribe`] is called.
//!
//! # Lifecycle
//!
//! ```text
//! Running{attempt} ──poll ok──▶ Running{0} ──▶ next poll (no delay)
//!        │
//!        ├──poll err──▶ Running{attempt+1} ──sleep──▶ retry same input
//!        │
//!        └──unsubscribe──▶ Stopped (in-flight poll cancelled, sleep interrupted)
//! ```
//!
//! Polls of one subscription never overlap: the next one is only issued once
//! the previous one has settled.

use crate::client::cancellable::{CancelHandle, CancellableRequest};
use crate::client::executor::RequestExecutor;
use crate::client::utils::retry_delay;
use crate::error::{ClientError, Result, TransportError};
use crate::types::Procedure;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives each poll result.
pub type DataCallback = Box<dyn FnMut(Value) + Send>;

/// Receives each non-reconnect poll failure.
pub type ErrorCallback = Box<dyn FnMut(&ClientError) + Send>;

/// Derives the next cursor from a poll result.
pub type NextInput = Box<dyn FnMut(&Value) -> Option<Value> + Send>;

/// Caller side of a subscription.
///
/// # Examples
///
/// ```
/// use rpc_router_client::client::SubscriptionOptions;
/// use serde_json::{json, Value};
///
/// let options = SubscriptionOptions::new(json!(0), |data: &Value| {
///     Some(json!(data.as_array().map_or(0, |items| items.len())))
/// })
/// .on_data(|data| println!("got {data}"))
/// .on_error(|err| eprintln!("poll failed: {err}"));
/// ```
pub struct SubscriptionOptions {
    pub(crate) initial_input: Option<Value>,
    pub(crate) next_input: NextInput,
    pub(crate) on_data: Option<DataCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl SubscriptionOptions {
    /// Start polling with `initial_input`, advancing the cursor with `next_input`.
    ///
    /// # Arguments
    ///
    /// * `initial_input` - Cursor sent with the first poll; `None` sends `{}`
    /// * `next_input` - Maps each poll result to the cursor of the next poll
    pub fn new<F>(initial_input: impl Into<Option<Value>>, next_input: F) -> Self
    where
        F: FnMut(&Value) -> Option<Value> + Send + 'static,
    {
        SubscriptionOptions {
            initial_input: initial_input.into(),
            next_input: Box::new(next_input),
            on_data: None,
            on_error: None,
        }
    }

    /// Called with every successful poll result.
    pub fn on_data<F>(mut self, on_data: F) -> Self
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.on_data = Some(Box::new(on_data));
        self
    }

    /// Called with every failure that triggers a backoff retry.
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnMut(&ClientError) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

/// Backoff and reconnect parameters, taken from the client config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) base_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
    pub(crate) reconnect_status: u16,
}

/// Phase of a subscription loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Polling. `attempt` counts consecutive failures.
    Running {
        /// Consecutive failures since the last success.
        attempt: u32,
    },
    /// Unsubscribed. Terminal.
    Stopped,
}

#[derive(Debug)]
struct LoopState {
    phase: LoopPhase,
    current: Option<CancelHandle>,
}

/// State owned by one loop; the handle only ever stops it.
#[derive(Debug)]
pub(crate) struct LoopShared {
    state: Mutex<LoopState>,
    stop: CancellationToken,
}

impl LoopShared {
    pub(crate) fn new() -> Self {
        LoopShared {
            state: Mutex::new(LoopState {
                phase: LoopPhase::Running { attempt: 0 },
                current: None,
            }),
            stop: CancellationToken::new(),
        }
    }

    fn phase(&self) -> LoopPhase {
        self.state.lock().phase
    }

    fn is_stopped(&self) -> bool {
        self.phase() == LoopPhase::Stopped
    }

    /// Stop the loop and cancel the in-flight poll.
    fn stop(&self) {
        let current = {
            let mut state = self.state.lock();
            state.phase = LoopPhase::Stopped;
            state.current.take()
        };
        self.stop.cancel();
        if let Some(request) = current {
            request.cancel();
        }
    }

    /// Remember the in-flight poll. Refused once stopped.
    fn track(&self, request: CancelHandle) -> bool {
        let mut state = self.state.lock();
        if state.phase == LoopPhase::Stopped {
            return false;
        }
        state.current = Some(request);
        true
    }

    fn untrack(&self) {
        self.state.lock().current = None;
    }

    /// Reset the attempt counter after a success. `false` once stopped.
    fn record_success(&self) -> bool {
        let mut state = self.state.lock();
        match state.phase {
            LoopPhase::Stopped => false,
            LoopPhase::Running { .. } => {
                state.phase = LoopPhase::Running { attempt: 0 };
                true
            }
        }
    }

    /// Bump the attempt counter after a failure. `None` once stopped.
    fn record_failure(&self) -> Option<u32> {
        let mut state = self.state.lock();
        match state.phase {
            LoopPhase::Stopped => None,
            LoopPhase::Running { attempt } => {
                let attempt = attempt.saturating_add(1);
                state.phase = LoopPhase::Running { attempt };
                Some(attempt)
            }
        }
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle does not stop the loop; call
/// [`unsubscribe`](Subscription::unsubscribe).
#[derive(Debug)]
pub struct Subscription {
    shared: Arc<LoopShared>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop polling. Cancels the in-flight poll and any pending retry. The
    /// loop checks the stop before every callback, so a callback already
    /// running may finish but no new one starts. Idempotent.
    pub fn unsubscribe(&self) {
        self.shared.stop();
    }

    /// Whether the loop is still polling.
    pub fn is_active(&self) -> bool {
        !self.shared.is_stopped()
    }

    /// Consecutive failures since the last success, or `None` once stopped.
    pub fn attempt(&self) -> Option<u32> {
        match self.shared.phase() {
            LoopPhase::Running { attempt } => Some(attempt),
            LoopPhase::Stopped => None,
        }
    }

    /// Wait for the loop task to finish. Only returns after `unsubscribe`.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}

/// Start a subscription loop on the current tokio runtime.
pub(crate) fn spawn_subscription(
    executor: Arc<RequestExecutor>,
    path: String,
    options: SubscriptionOptions,
    policy: RetryPolicy,
) -> Subscription {
    let shared = Arc::new(LoopShared::new());
    let task = tokio::spawn(run_loop(executor, path, options, policy, shared.clone()));
    Subscription { shared, task }
}

async fn run_loop(
    executor: Arc<RequestExecutor>,
    path: String,
    mut options: SubscriptionOptions,
    policy: RetryPolicy,
    shared: Arc<LoopShared>,
) {
    let mut input = options.initial_input.take();

    loop {
        match subscription_once(&executor, &path, input.clone(), policy, &shared).await {
            Ok(data) => {
                if !shared.record_success() {
                    return;
                }
                let next = (options.next_input)(&data);
                // next_input may have run across an unsubscribe
                if shared.is_stopped() {
                    return;
                }
                if let Some(on_data) = options.on_data.as_mut() {
                    on_data(data);
                }
                input = next;
            }
            Err(err) => {
                let Some(attempt) = shared.record_failure() else {
                    return;
                };
                if let Some(on_error) = options.on_error.as_mut() {
                    on_error(&err);
                }

                let delay = retry_delay(attempt, policy.base_delay_ms, policy.max_delay_ms);
                if executor.enable_logging {
                    tracing::warn!(
                        path = %path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "subscription poll failed, retrying: {}",
                        err
                    );
                }

                tokio::select! {
                    _ = shared.stop.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                if shared.is_stopped() {
                    return;
                }
            }
        }
    }
}

/// One logical poll: reissues immediately while the server asks to reconnect.
pub(crate) async fn subscription_once(
    executor: &Arc<RequestExecutor>,
    path: &str,
    input: Option<Value>,
    policy: RetryPolicy,
    shared: &LoopShared,
) -> Result<Value> {
    loop {
        let request =
            CancellableRequest::spawn(executor.clone(), Procedure::subscription(path, input.clone()));
        if !shared.track(request.canceller()) {
            request.cancel();
            return Err(TransportError::Aborted.into());
        }

        let result = request.await;
        shared.untrack();

        match result {
            Err(err) if err.is_reconnect_with(policy.reconnect_status) && !shared.is_stopped() => {
                if executor.enable_logging {
                    tracing::debug!(path = %path, "subscription reconnect requested");
                }
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_then_success_resets_attempt() {
        let shared = LoopShared::new();
        assert_eq!(shared.record_failure(), Some(1));
        assert_eq!(shared.record_failure(), Some(2));
        assert_eq!(shared.phase(), LoopPhase::Running { attempt: 2 });
        assert!(shared.record_success());
        assert_eq!(shared.phase(), LoopPhase::Running { attempt: 0 });
    }

    #[test]
    fn test_stopped_refuses_everything() {
        let shared = LoopShared::new();
        shared.stop();
        assert!(shared.is_stopped());
        assert!(!shared.record_success());
        assert_eq!(shared.record_failure(), None);
        assert!(shared.stop.is_cancelled());
    }

    #[test]
    fn test_stop_cancels_tracked_request() {
        use crate::client::cancellable::{RequestLifecycle, RequestState};

        let shared = LoopShared::new();
        let lifecycle = Arc::new(RequestLifecycle::new(Some(CancellationToken::new())));
        let handle = CancelHandle::from_lifecycle(lifecycle.clone());
        assert!(shared.track(handle.clone()));

        shared.stop();
        assert_eq!(handle.state(), RequestState::Aborting);
        assert!(shared.state.lock().current.is_none());
        assert!(!shared.track(handle));
    }
}
