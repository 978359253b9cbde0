use crate::browser_ai::{ChatPage, ElementState, Locator};
use crate::config::TimingConfig;
use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Element polling step while waiting on page state.
pub const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn for_reads(timing: &TimingConfig) -> Self {
        Self::new(timing.read_retry_attempts, timing.read_retry_backoff())
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.backoff`
/// between attempts. Only errors accepted by `should_retry` are retried; the
/// last error is returned once attempts run out.
pub async fn retry_bounded<T, F, Fut, R>(
    policy: RetryPolicy,
    operation: &str,
    should_retry: R,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: Fn(&AppError) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                tracing::warn!(operation, attempt, max_attempts, error = %e, "retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::error!(operation, attempt, error = %e, "giving up");
                }
                return Err(e);
            }
        }
    }
}

/// Poll `locator` until `condition` holds or `timeout` passes. Transient read
/// failures count as "not yet"; other errors are returned.
pub async fn wait_for_element<P, C>(
    page: &P,
    locator: &Locator,
    timeout: Duration,
    condition: C,
) -> Result<bool>
where
    P: ChatPage + ?Sized,
    C: Fn(&ElementState) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        match page.query(locator).await {
            Ok(state) if condition(&state) => return Ok(true),
            Ok(_) => {}
            Err(e) if e.is_transient() => {
                tracing::debug!(selector = %locator, error = %e, "transient error while waiting");
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(selector = %locator, ?timeout, "wait timed out");
            return Ok(false);
        }
        tokio::time::sleep(ELEMENT_POLL_INTERVAL.min(deadline - now)).await;
    }
}

pub async fn wait_for_visible<P>(page: &P, locator: &Locator, timeout: Duration) -> Result<bool>
where
    P: ChatPage + ?Sized,
{
    wait_for_element(page, locator, timeout, |s| s.found && s.visible).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let started = Instant::now();

        let value = retry_bounded(policy, "read", AppError::is_transient, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(AppError::TransientRead("Execution context was destroyed".into()))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let result: Result<()> = retry_bounded(policy, "read", AppError::is_transient, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::TransientRead("Execution context was destroyed".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::TransientRead(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let result: Result<()> = retry_bounded(policy, "read", AppError::is_transient, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Browser("boom".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Browser(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
