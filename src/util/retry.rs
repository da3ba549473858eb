//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::HelmError;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A single attempt: the first failure is returned as-is.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Execute an async operation with retry.
    ///
    /// Only errors reporting [`HelmError::is_retryable`] are retried.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, HelmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HelmError>>,
    {
        let mut backoff = self.initial_backoff;
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            tracing::warn!(
                attempt,
                max_attempts,
                error = %err,
                "Retrying after error"
            );

            let delay = match err {
                HelmError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(ms).min(self.max_backoff),
                _ => {
                    // jitter: 75% to 125% of backoff
                    let jitter_factor = 0.75 + (rand_factor() * 0.5);
                    Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor)
                }
            };
            tokio::time::sleep(delay).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
        }
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default().with_max_attempts(3);

        let value = policy
            .execute(move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(HelmError::RateLimited {
                        retry_after_ms: Some(10),
                    })
                } else {
                    Ok(42)
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let err = policy
            .execute(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HelmError::Protocol("bad frame".into()))
            })
            .await
            .expect_err("protocol errors are permanent");

        assert!(matches!(err, HelmError::Protocol(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_makes_a_single_attempt() {
        let attempts = &AtomicU32::new(0);

        let err = RetryPolicy::none()
            .execute(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HelmError::Timeout(10))
            })
            .await
            .expect_err("no retries");

        assert!(matches!(err, HelmError::Timeout(10)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
