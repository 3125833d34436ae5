//! Retry with backoff for transient publish failures.

use std::time::Duration;

use super::TransportResult;

/// Retry delays for transient transport errors (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Runs `operation`, retrying transient failures after 200ms, 500ms and 1000ms.
///
/// Non-transient errors are returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(action: &str, mut operation: F) -> TransportResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = TransportResult<T>>,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        let Some(&delay_ms) = RETRY_DELAYS_MS.get(attempt) else {
            return Err(error);
        };
        attempt += 1;

        log::warn!(
            "[Transport] {} failed: {}; retrying (attempt {}/{}) in {}ms",
            action,
            error,
            attempt + 1,
            RETRY_DELAYS_MS.len() + 1,
            delay_ms
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
