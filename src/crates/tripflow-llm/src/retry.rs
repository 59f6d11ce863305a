//! Fixed-delay retry for transient model overload.
//!
//! The retry policy is intentionally narrow: a fixed short delay, a fixed
//! attempt bound, and only for [`LlmError::Overloaded`]. Anything else
//! propagates immediately - auth failures and malformed responses do not get
//! better by waiting.

use crate::error::{LlmError, Result};
use std::future::Future;
use std::time::Duration;

/// Default attempt bound for overloaded-model retries.
pub const MAX_RETRIES: usize = 3;

/// Default delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Run `operation` up to `max_attempts` times, sleeping `delay` between
/// attempts, retrying only on [`LlmError::Overloaded`].
pub async fn retry_on_overload<T, F, Fut>(
    max_attempts: usize,
    delay: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(LlmError::Overloaded(_)) if attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    "model overloaded, retrying after {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
