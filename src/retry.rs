//! Retry on rate limiting with exponential backoff.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

/// Run `operation`, retrying only while it fails with HTTP 429.
///
/// Backoff starts at `initial_backoff` and grows by `multiplier`, sleeping
/// only between attempts. The default policy makes three attempts with 2s
/// and 4s pauses, so the 8s step of the series would only precede a fourth
/// attempt and is never slept. Any other error is returned immediately. When
/// every attempt was rate limited the result is
/// [`ApiError::MaxRetriesExceeded`] as soon as the last attempt fails.
pub async fn with_rate_limit_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    // backon counts retries, not attempts
    let max_retries = policy.max_attempts.saturating_sub(1) as usize;

    let backoff = ExponentialBuilder::default()
        .with_min_delay(policy.initial_backoff)
        .with_factor(policy.multiplier)
        .with_max_times(max_retries);

    let attempts = AtomicU32::new(1);

    operation
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(ApiError::is_rate_limited)
        .notify(|err: &ApiError, dur: Duration| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(
                attempt,
                backoff_ms = dur.as_millis() as u64,
                error = %err,
                "rate limited, backing off"
            );
        })
        .await
        .map_err(|e| {
            if e.is_rate_limited() {
                ApiError::MaxRetriesExceeded {
                    attempts: attempts.load(Ordering::SeqCst),
                }
            } else {
                e
            }
        })
}
