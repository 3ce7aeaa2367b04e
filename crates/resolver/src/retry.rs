//! Retry policy with linear backoff

use std::time::Duration;

use nodepack_core::config::{DEFAULT_BACKOFF_UNIT_MS, DEFAULT_RETRY_ATTEMPTS};
use nodepack_core::Settings;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first one included
    pub max_attempts: u32,
    /// Unit of the linear backoff
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_unit: Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS),
        }
    }
}

impl RetryPolicy {
    /// Build the policy from build settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.retry_attempts,
            backoff_unit: settings.backoff_unit(),
        }
    }

    /// Delay after the 1-based `attempt` failed: `attempt + 1` units.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt.saturating_add(1))
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    #[must_use]
    pub const fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..policy.max_attempts)
            .map(|a| policy.delay_after(a).as_secs())
            .collect();
        assert_eq!(delays, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_attempt_ceiling() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_another(4));
        assert!(!policy.allows_another(5));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            retry_attempts: 2,
            backoff_unit_ms: 5,
            ..Settings::default()
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay_after(1), Duration::from_millis(10));
    }
}
