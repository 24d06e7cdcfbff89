//! Uniform retry policy for retryable provider errors.
//!
//! One policy everywhere: up to `max_attempts` tries, attempt N waiting
//! N × the backoff unit first. Only errors classified retryable
//! (provider overload) are retried; everything else returns on the
//! first failure.

use std::time::Duration;

use mathshorts_core::config::GeneratorConfig;
use mathshorts_core::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_unit: Duration::from_secs(config.backoff_unit_secs),
        }
    }

    /// Run `op` until it succeeds, fails non-retryably, or attempts run
    /// out. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_unit * attempt;
                    tracing::warn!(
                        "⚠️ {} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathshorts_core::error::MathShortsError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(3),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_overload_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run("generate", |_attempt| {
                let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
                async move {
                    if n < 3 {
                        Err(MathShortsError::ProviderOverloaded("529".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let err = policy()
            .run("generate", |_attempt| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err::<(), _>(MathShortsError::Generation("bad json".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MathShortsError::Generation(_)));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_exhausted() {
        let calls = AtomicU32::new(0);
        let err = policy()
            .run("generate", |_attempt| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err::<(), _>(MathShortsError::ProviderOverloaded("529".into())) }
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_with_attempt() {
        let start = tokio::time::Instant::now();
        let _ = policy()
            .run("generate", |_attempt| async {
                Err::<(), _>(MathShortsError::ProviderOverloaded("529".into()))
            })
            .await;
        // 3s after attempt 1 + 6s after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }
}
