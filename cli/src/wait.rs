use std::thread;
use std::time::Duration;

use crate::error::{CliError, Result};

/// Bounded polling: at most `max_attempts` checks, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calls `check` until it yields a value, sleeping between attempts.
    ///
    /// `check` receives the 1-based attempt number. Errors from `check` end
    /// the wait immediately.
    pub fn wait_until<T, F>(&self, what: &'static str, mut check: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<Option<T>>,
    {
        for attempt in 1..=self.max_attempts {
            if let Some(value) = check(attempt)? {
                return Ok(value);
            }
            tracing::debug!(what, attempt, "condition not met yet");
            if attempt < self.max_attempts {
                thread::sleep(self.interval());
            }
        }
        Err(CliError::Timeout {
            what,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_first_ready_value() {
        let policy = RetryPolicy::new(Duration::ZERO, 5);
        let mut seen = Vec::new();
        let value = policy
            .wait_until("test", |attempt| {
                seen.push(attempt);
                Ok((attempt == 3).then_some(attempt * 10))
            })
            .unwrap();
        assert_eq!(value, 30);
        assert_eq!(seen, [1, 2, 3]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(Duration::ZERO, 2);
        let mut calls = 0;
        let err = policy
            .wait_until::<(), _>("counter change", |_| {
                calls += 1;
                Ok(None)
            })
            .unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(
            err.to_string(),
            "gave up waiting for counter change after 2 attempts"
        );
    }

    #[test]
    fn errors_stop_the_wait() {
        let policy = RetryPolicy::new(Duration::ZERO, 10);
        let mut calls = 0;
        let err = policy
            .wait_until::<(), _>("deploy", |_| {
                calls += 1;
                Err(CliError::Message("boom".to_string()))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn zero_attempts_still_checks_once() {
        assert_eq!(RetryPolicy::new(Duration::ZERO, 0).max_attempts(), 1);
    }
}
