//! Fixed-delay retry for transient collector failures
//!
//! Retries indefinitely with a constant pause between attempts. The
//! cancellation token is watched both while an attempt runs and while
//! sleeping; once it fires the loop stops with [`CollectError::Cancelled`]
//! and the caller's operation is dropped.

use crate::error::{CollectError, CollectResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Run `operation` until it succeeds, fails permanently, or is cancelled
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g. the archive file name)
/// * `delay` - Pause between attempts
/// * `cancel` - External interrupt
/// * `operation` - Async closure performing one attempt
/// * `on_retry` - Called with the attempt number and error before each pause
pub async fn retry_with_fixed_delay<F, Fut, T, N>(
    operation_name: &str,
    delay: Duration,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: N,
) -> CollectResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollectResult<T>>,
    N: FnMut(u32, &CollectError),
{
    let start_time = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }

        attempt += 1;
        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectError::Cancelled),
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            error = %err,
            retry_in_secs = delay.as_secs(),
            "Operation failed, will retry"
        );
        on_retry(attempt, &err);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CollectError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
