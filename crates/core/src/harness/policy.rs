use std::time::Duration;

use crate::config::PollingConfig;

/// Bounded polling schedule for one job.
///
/// The wait before lookup `n` (0-based) is `interval * backoff_multiplier^n`,
/// never more than `max(max_interval, interval)`. A multiplier of 1.0 gives
/// a fixed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            max_attempts: config.job_lookup_tries,
            interval: Duration::from_secs(config.job_lookup_secs),
            backoff_multiplier: config.backoff_multiplier,
            max_interval: Duration::from_secs(config.max_interval_secs),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff_multiplier: 1.0,
            max_interval: interval,
        }
    }

    /// Wait before the given lookup attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let cap = self.max_interval.max(self.interval).as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let secs = (self.interval.as_secs_f64() * factor).min(cap);
        Duration::from_secs_f64(secs)
    }

    /// Longest a job can be followed before it is given up on.
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts).map(|n| self.delay_before(n)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_six_lookups_ten_seconds_apart() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 6);
        for attempt in 0..6 {
            assert_eq!(policy.delay_before(attempt), Duration::from_secs(10));
        }
        assert_eq!(policy.total_budget(), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = PollPolicy {
            max_attempts: 5,
            interval: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_before(0), Duration::from_secs(2));
        assert_eq!(policy.delay_before(1), Duration::from_secs(4));
        assert_eq!(policy.delay_before(2), Duration::from_secs(8));
        assert_eq!(policy.delay_before(3), Duration::from_secs(10));
        assert_eq!(policy.delay_before(40), Duration::from_secs(10));
        assert_eq!(policy.total_budget(), Duration::from_secs(34));
    }

    #[test]
    fn test_cap_never_shortens_base_interval() {
        let policy = PollPolicy {
            max_attempts: 2,
            interval: Duration::from_secs(30),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_before(1), Duration::from_secs(30));
    }

    #[test]
    fn test_shrinking_multiplier_is_treated_as_fixed() {
        let policy = PollPolicy {
            backoff_multiplier: 0.1,
            ..PollPolicy::fixed(3, Duration::from_secs(1))
        };
        assert_eq!(policy.delay_before(2), Duration::from_secs(1));
    }
}
