use crate::error::{CtError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Call `op` every `interval` until it yields `Some`, or fail with
/// [`CtError::Timeout`] once `deadline` has elapsed. No backoff.
///
/// The last sleep ends at the deadline; no attempt is made at the deadline
/// itself.
pub async fn poll_until<T, F, Fut>(deadline: Duration, interval: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if let Some(value) = op().await? {
            tracing::debug!(attempt, elapsed = ?start.elapsed(), "Poll condition met");
            return Ok(value);
        }
        let remaining = deadline.saturating_sub(start.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(interval.min(remaining)).await;
        }
        if start.elapsed() >= deadline {
            tracing::warn!(attempt, ?deadline, "Poll deadline expired");
            return Err(CtError::Timeout(deadline));
        }
    }
}
