//! Retry policy engine — decides whether a queued notification is due for
//! a (re)delivery attempt.
//!
//! The backoff schedule and the retry ceiling are one configuration object:
//! the ceiling is the schedule length, so the two cannot drift apart.

use chrono::{DateTime, Duration, Utc};

/// HTTP-style status range treated as a delivery failure. Anything outside
/// it (most notably 2xx) is terminal success.
const FAILURE_RANGE: std::ops::RangeInclusive<i32> = 400..=599;

/// Invariant violations in queue data. These are raised loudly and the
/// dispatcher skips the offending record — never guessed around.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("record was attempted (retry_count = {retry_count}) but has no last attempt time")]
    MissingAttemptTime { retry_count: i32 },
    #[error("retry_count {retry_count} is outside the schedule range")]
    RetryCountOutOfRange { retry_count: i32 },
}

/// Backoff schedule indexed by current retry count, plus the derived retry
/// ceiling.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    /// The reference schedule: immediate, 1 minute, 15 minutes, 1 hour, 1 day.
    pub fn standard() -> Self {
        Self::new(vec![
            Duration::zero(),
            Duration::minutes(1),
            Duration::minutes(15),
            Duration::hours(1),
            Duration::days(1),
        ])
    }

    /// Retry ceiling: the number of schedule entries.
    pub fn max_retry(&self) -> i32 {
        self.schedule.len() as i32
    }

    /// Decide whether a record is due for a delivery attempt at `now`.
    ///
    /// - never attempted (`response_code == None`) — always due
    /// - terminal success (status outside [400, 599]) — never due
    /// - retry budget exhausted — never due
    /// - otherwise due once the scheduled wait since the last attempt has
    ///   elapsed
    pub fn is_due(
        &self,
        response_code: Option<i32>,
        retry_count: i32,
        last_attempt_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool, PolicyError> {
        let Some(code) = response_code else {
            return Ok(true);
        };

        if retry_count < 0 {
            return Err(PolicyError::RetryCountOutOfRange { retry_count });
        }

        // An attempted record with no attempt timestamp is corrupt data,
        // regardless of what the status code says.
        let Some(last_attempt_at) = last_attempt_at else {
            return Err(PolicyError::MissingAttemptTime { retry_count });
        };

        if !FAILURE_RANGE.contains(&code) {
            return Ok(false);
        }

        if retry_count >= self.max_retry() {
            return Ok(false);
        }

        let wait = self.schedule[retry_count as usize];
        Ok(last_attempt_at + wait <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::standard()
    }

    fn waits() -> Vec<Duration> {
        vec![
            Duration::zero(),
            Duration::minutes(1),
            Duration::minutes(15),
            Duration::hours(1),
            Duration::days(1),
        ]
    }

    #[test]
    fn test_never_attempted_is_always_due() {
        let now = Utc::now();
        assert!(policy().is_due(None, 0, None, now).unwrap());
        // A null status takes precedence over everything else.
        assert!(policy().is_due(None, 3, Some(now), now).unwrap());
    }

    #[test]
    fn test_success_code_is_never_due() {
        let now = Utc::now();
        for code in [200, 201, 302, 399] {
            assert!(!policy().is_due(Some(code), 1, Some(now), now).unwrap());
        }
    }

    #[test]
    fn test_due_exactly_when_wait_elapsed() {
        let now = Utc::now();
        for (retry_count, wait) in waits().into_iter().enumerate() {
            for code in [400, 404, 500, 599] {
                let retry_count = retry_count as i32;
                // One second short of the scheduled wait: not due.
                let last = now - wait + Duration::seconds(1);
                assert!(
                    !policy().is_due(Some(code), retry_count, Some(last), now).unwrap(),
                    "retry {retry_count} code {code} should not be due early"
                );
                // Exactly the scheduled wait: due.
                let last = now - wait;
                assert!(
                    policy().is_due(Some(code), retry_count, Some(last), now).unwrap(),
                    "retry {retry_count} code {code} should be due at the boundary"
                );
            }
        }
    }

    #[test]
    fn test_exhausted_budget_is_never_due() {
        let now = Utc::now();
        let long_ago = now - Duration::days(30);
        for retry_count in [5, 6, 100] {
            assert!(
                !policy()
                    .is_due(Some(500), retry_count, Some(long_ago), now)
                    .unwrap()
            );
        }
    }

    #[test]
    fn test_missing_attempt_time_is_an_invariant_violation() {
        let now = Utc::now();
        for code in [200, 400, 500, 599] {
            let err = policy().is_due(Some(code), 2, None, now).unwrap_err();
            assert_eq!(err, PolicyError::MissingAttemptTime { retry_count: 2 });
        }
    }

    #[test]
    fn test_negative_retry_count_is_an_invariant_violation() {
        let now = Utc::now();
        let err = policy().is_due(Some(500), -1, Some(now), now).unwrap_err();
        assert_eq!(err, PolicyError::RetryCountOutOfRange { retry_count: -1 });
    }

    #[test]
    fn test_ceiling_tracks_schedule_length() {
        assert_eq!(policy().max_retry(), 5);
        let short = RetryPolicy::new(vec![Duration::zero(), Duration::minutes(5)]);
        assert_eq!(short.max_retry(), 2);
        let now = Utc::now();
        // retry 2 is exhausted under the short schedule
        assert!(
            !short
                .is_due(Some(500), 2, Some(now - Duration::days(1)), now)
                .unwrap()
        );
    }
}
