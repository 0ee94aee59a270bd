//! Bounded retry for transient store failures.
//!
//! The activation engine never retries on its own. Workflow callers wrap
//! idempotent reads in [`RetryPolicy::run`]; only errors whose category is
//! [`ErrorCategory::TransientStore`] are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::{ActivationError, ErrorCategory};

/// Default number of attempts, including the first.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Exponential backoff with a fixed attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Build a policy; at least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that makes a single attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total attempts, including the first. Always at least one.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use classroom_onboarding::domain::RetryPolicy;
    /// assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    /// assert_eq!(RetryPolicy::none().max_attempts(), 1);
    /// ```
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget is
    /// spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ActivationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ActivationError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err)
                    if err.category() == ErrorCategory::TransientStore
                        && attempt < self.max_attempts =>
                {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
