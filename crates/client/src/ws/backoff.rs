//! Reconnect backoff and the cancellable retry timer.

use std::time::Duration;

use tokio::task::JoinHandle;

pub const INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const MAX_DELAY: Duration = Duration::from_secs(30);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for reconnect behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Consecutive failures after which retrying stops (0 = infinite).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            initial_delay: INITIAL_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    /// The retry budget is spent; only a manual retry or a new session reconnects.
    Exhausted,
}

impl ReconnectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// `min(initial_delay * 2^attempt, max_delay)`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Decide on a retry given the failure count *including* the failure
    /// that just happened.
    ///
    /// The first failure waits `delay_for_attempt(0)`, the second
    /// `delay_for_attempt(1)` and so on.
    pub fn next_retry(&self, failed_attempts: u32) -> RetryDecision {
        if self.max_attempts > 0 && failed_attempts >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry {
            delay: self.delay_for_attempt(failed_attempts.saturating_sub(1)),
        }
    }
}

/// Backoff delay with the default 1s initial / 30s maximum schedule.
pub fn delay_for_attempt(attempt: u32) -> Duration {
    ReconnectConfig::default().delay_for_attempt(attempt)
}

/// A one-shot timer that runs a callback unless cancelled first.
///
/// Dropping the timer cancels it, so a timer owned by a struct is released
/// on every path that drops or replaces it.
#[derive(Debug)]
pub struct RetryTimer {
    task: Option<JoinHandle<()>>,
}

impl RetryTimer {
    /// Run `on_fire` after `delay`. Must be called from within a tokio runtime.
    pub fn start<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self { task: Some(task) }
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    /// Whether the callback has already run (or the timer was cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn delays_double_then_cap() {
        assert_eq!(delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(delay_for_attempt(4), Duration::from_millis(16000));
        assert_eq!(delay_for_attempt(5), Duration::from_millis(30000));
        assert_eq!(delay_for_attempt(6), Duration::from_millis(30000));
        assert_eq!(delay_for_attempt(40), Duration::from_millis(30000));
        assert_eq!(delay_for_attempt(u32::MAX), MAX_DELAY);
    }

    #[test]
    fn delay_formula_holds_below_the_cap() {
        for n in 0..MAX_RECONNECT_ATTEMPTS {
            let expected = (1000u64 * 2u64.pow(n)).min(30_000);
            assert_eq!(delay_for_attempt(n), Duration::from_millis(expected));
        }
    }

    #[test]
    fn retries_until_budget_is_spent() {
        let config = ReconnectConfig::default();
        assert_eq!(
            config.next_retry(1),
            RetryDecision::Retry {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(
            config.next_retry(3),
            RetryDecision::Retry {
                delay: Duration::from_secs(4)
            }
        );
        assert_eq!(
            config.next_retry(4),
            RetryDecision::Retry {
                delay: Duration::from_secs(8)
            }
        );
        assert_eq!(config.next_retry(5), RetryDecision::Exhausted);
        assert_eq!(config.next_retry(9), RetryDecision::Exhausted);
    }

    #[test]
    fn zero_max_attempts_retries_forever() {
        let config = ReconnectConfig::new().max_attempts(0);
        assert_eq!(
            config.next_retry(1_000),
            RetryDecision::Retry { delay: MAX_DELAY }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = RetryTimer::start(Duration::from_secs(2), move || {
            flag.store(true, Ordering::SeqCst)
        });

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_or_dropped_timers_never_fire() {
        let fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        let timer = RetryTimer::start(Duration::from_secs(1), move || {
            flag.store(true, Ordering::SeqCst)
        });
        timer.cancel();

        let flag = fired.clone();
        drop(RetryTimer::start(Duration::from_secs(1), move || {
            flag.store(true, Ordering::SeqCst)
        }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
