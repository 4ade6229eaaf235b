//! Retry policy and executor.

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ProviderError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Growth factor applied after every retry
    pub backoff_multiplier: f64,
    /// Random scaling applied to each delay (0.0 disables jitter)
    pub jitter_factor: f64,
    /// Custom retry condition; defaults to [`ProviderError::is_retryable`]
    pub retry_condition: Option<fn(&ProviderError) -> bool>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            retry_condition: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub const fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_retry_condition(mut self, condition: fn(&ProviderError) -> bool) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    /// Check if an error should be retried
    pub fn should_retry(&self, error: &ProviderError) -> bool {
        match self.retry_condition {
            Some(condition) => condition(error),
            None => error.is_retryable(),
        }
    }

    /// Delay generator for one retry loop
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.backoff_multiplier)
            .with_randomization_factor(self.jitter_factor)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Runs an operation under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying retryable failures until attempts run out
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut backoff = self.policy.backoff();
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !self.policy.should_retry(&error) || attempt >= self.policy.max_attempts {
                        return Err(error);
                    }
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_delay);
                    tracing::warn!(
                        "Attempt {attempt}/{} failed: {error}. Retrying in {delay:?}",
                        self.policy.max_attempts
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Retry an operation with the default rate-limit policy
pub async fn retry_with_default<F, Fut, T>(operation: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    RetryExecutor::default().execute(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    async fn rate_limited_then_ok(executor: &RetryExecutor, failures: u32) -> (u32, Duration) {
        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let result = executor
            .execute(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < failures {
                        Err(ProviderError::RateLimitError("429".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(result.is_ok());
        (counter.load(Ordering::SeqCst), start.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn delays_start_at_one_second_and_double() {
        let executor = RetryExecutor::new(RetryPolicy::new().with_jitter_factor(0.0));
        let (attempts, elapsed) = rate_limited_then_ok(&executor, 3).await;
        assert_eq!(attempts, 4);
        assert!(elapsed >= Duration::from_secs(7), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(7010), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn default_jitter_stays_within_ten_percent() {
        let (attempts, elapsed) = rate_limited_then_ok(&RetryExecutor::default(), 3).await;
        assert_eq!(attempts, 4);
        assert!(elapsed >= Duration::from_millis(6300), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(7700), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_does_not_wait() {
        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let result: Result<(), _> = RetryExecutor::default()
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::api_error(500, "internal"))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_operation_succeeds_after_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new().with_jitter_factor(0.0));

        let result = executor
            .execute(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::RateLimitError("429".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = RetryExecutor::default()
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::api_error(400, "bad request"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = RetryExecutor::default()
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::RateLimitError("quota".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::RateLimitError(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
