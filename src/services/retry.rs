use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{config::ConflictRetryConfig, error::ServiceError};

/// Exponential backoff with jitter for compare-and-swap writes that lost a race.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// At least one attempt; `max_delay` never below `initial_delay`.
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Retry immediately; used by tests and simulations.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Run `attempt` until it stops failing with [`ServiceError::Conflict`] or the budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(ServiceError::Conflict(detail)) => {
                    if tries >= self.max_attempts {
                        warn!(operation, attempts = tries, %detail, "giving up after repeated write conflicts");
                        return Err(ServiceError::Conflict(format!(
                            "{operation} gave up after {tries} attempt(s): {detail}"
                        )));
                    }
                    let delay = self.delay_for(tries);
                    debug!(
                        operation,
                        attempt = tries,
                        delay_ms = delay.as_millis() as u64,
                        "write conflict; retrying"
                    );
                    sleep(delay).await;
                    tries += 1;
                }
                other => return other,
            }
        }
    }

    /// Backoff before retry number `attempt` (1-based): half fixed, half random.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let ceiling = self.initial_delay.saturating_mul(factor).min(self.max_delay);
        let half = ceiling / 2;
        let half_ms = half.as_millis() as u64;
        if half_ms == 0 {
            return ceiling;
        }
        let jitter = rand::rng().random_range(0..=half_ms);
        ceiling - half + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ConflictRetryConfig::default().into()
    }
}

impl From<ConflictRetryConfig> for RetryPolicy {
    fn from(config: ConflictRetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn delay_grows_but_stays_under_the_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(40));

        let first = policy.delay_for(1);
        assert!(first >= Duration::from_millis(5) && first <= Duration::from_millis(10));

        for attempt in 3..8 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(40));
        }
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ServiceError::Conflict("stale".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_conflict() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(2)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Conflict("stale".into()))
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::NotFound("game".into()))
            })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
