//! Backoff helpers for the subscription loop.
//!
//! # Examples
//!
//! ```
//! use rpc_router_client::client::retry_delay;
//! use std::time::Duration;
//!
//! // First attempt is never throttled.
//! assert_eq!(retry_delay(0, 1000, 30_000), Duration::ZERO);
//! assert_eq!(retry_delay(1, 1000, 30_000), Duration::from_millis(2000));
//! assert_eq!(retry_delay(10, 1000, 30_000), Duration::from_millis(30_000));
//! ```

use std::time::Duration;

/// Delay before retry number `attempt`.
///
/// `0` for the first attempt, otherwise `min(base_ms * 2^attempt, cap_ms)`.
pub fn retry_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let delay_ms = 2_u64
        .checked_pow(attempt)
        .and_then(|factor| base_ms.checked_mul(factor))
        .map_or(cap_ms, |ms| ms.min(cap_ms));
    Duration::from_millis(delay_ms)
}
