//! Exponential-backoff retry for the very first `list-activities` request
//! on a freshly created session, to tolerate the Service's eventual
//! consistency.
//!
//! Cancellation is Rust's ordinary drop-the-future kind: every suspension
//! point here is a plain `.await`, so dropping the future that's driving
//! [`with_first_request_retry`] — e.g. because a consumer broke out of a
//! `stream()` loop — cancels whichever attempt or sleep is in flight
//! without any extra bookkeeping.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;
use crate::platform::Platform;

const MAX_RETRIES: u32 = 5;

fn delay_for_attempt(n: u32) -> Duration {
    let secs = 1u64.checked_shl(n).unwrap_or(u64::MAX).min(16);
    Duration::from_secs(secs)
}

/// Retries `f` while it returns a 404-class [`ApiError`], up to
/// [`MAX_RETRIES`] retries (6 attempts total), with delay
/// `min(1s * 2^n, 16s)` before retry `n`. Any other error propagates
/// immediately without retry.
pub async fn with_first_request_retry<F, Fut, T>(platform: &dyn Platform, mut f: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_not_found() && attempt < MAX_RETRIES => {
                platform.sleep(delay_for_attempt(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
