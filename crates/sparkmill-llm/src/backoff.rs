//! Retry with exponential backoff for provider HTTP calls

use crate::LlmError;
use std::future::Future;
use std::time::Duration;

/// Longest sleep between two attempts
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Sleep before retry number `retry` (1-based): 1s, 2s, 4s, ... capped at [`MAX_DELAY`]
fn retry_delay(retry: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(retry.saturating_sub(1))).min(MAX_DELAY)
}

/// Run `attempt` up to `max_retries` times, sleeping 1s, 2s, 4s, ... between
/// retryable failures. Non-retryable errors return immediately.
pub(crate) async fn with_backoff<T, F, Fut>(max_retries: u32, mut attempt: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_retries = max_retries.max(1);
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                tracing::debug!("Attempt {}/{} failed: {}", attempts + 1, max_retries, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }

        attempts += 1;
        if attempts < max_retries {
            tokio::time::sleep(retry_delay(attempts)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// Map a reqwest send error onto our taxonomy
pub(crate) fn classify_send_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Communication(format!("Request failed: {}", e))
    }
}
