//! Timeout and retry policy for remote sync calls.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::SyncError;

/// Per-call timeout with a bounded number of retries.
///
/// A timed-out attempt is final: it is reported as [`SyncError::Timeout`]
/// and not retried. Any other failure is retried after `retry_delay`, up to
/// `retries` additional attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay, keeping the default timeout.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            retries: 0,
            retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Run `attempt` under this policy.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once retries are exhausted, or
    /// [`SyncError::Timeout`] as soon as an attempt times out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut retries_left = self.retries;
        loop {
            match tokio::time::timeout(self.timeout, attempt()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if retries_left > 0 => {
                    retries_left -= 1;
                    debug!(operation, error = %e, retries_left, "Sync attempt failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(operation, timeout = ?self.timeout, "Sync attempt timed out");
                    return Err(SyncError::Timeout(self.timeout));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            retries,
            retry_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = fast(3)
            .run("update", || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(SyncError::Rejected("busy".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), SyncError> = fast(2)
            .run("add", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::Rejected("nope".to_string()))
                }
            })
            .await;

        assert_eq!(result, Err(SyncError::Rejected("nope".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), SyncError> = fast(3)
            .run("remove", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(result, Err(SyncError::Timeout(Duration::from_millis(50))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
