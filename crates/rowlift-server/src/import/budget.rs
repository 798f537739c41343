//! Time budget controller
//!
//! A cycle must stop well before the queue's hard timeout kills it mid-row,
//! which would corrupt counters. The deadline is set at 80% of the declared
//! maximum task duration; the remaining margin covers serializing state and
//! enqueuing the continuation.

use chrono::{DateTime, Duration, Utc};

/// Share of the configured task duration a cycle may spend, in percent.
pub const TASK_BUDGET_PERCENT: i64 = 80;

/// Deadline for a cycle starting at `now` under the given hard timeout.
pub fn compute_deadline(now: DateTime<Utc>, max_task_duration_secs: u64) -> DateTime<Utc> {
    let budget_secs = max_task_duration_secs as i64 * TASK_BUDGET_PERCENT / 100;
    now + Duration::seconds(budget_secs)
}

/// Whether the deadline has passed.
pub fn has_expired(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

/// Captures the deadline at cycle start.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    deadline: DateTime<Utc>,
}

impl TimeBudget {
    pub fn start(max_task_duration_secs: u64) -> Self {
        Self {
            deadline: compute_deadline(Utc::now(), max_task_duration_secs),
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        has_expired(self.deadline, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deadline_is_eighty_percent_of_duration() {
        let now = Utc.with_ymd_and_hms(2025, 4, 21, 10, 0, 0).unwrap();
        let deadline = compute_deadline(now, 60);
        assert_eq!(deadline, now + Duration::seconds(48));
    }

    #[test]
    fn test_deadline_truncates_fractional_seconds() {
        let now = Utc.with_ymd_and_hms(2025, 4, 21, 10, 0, 0).unwrap();
        // 80% of 59s is 47.2s; integer arithmetic keeps whole seconds.
        let deadline = compute_deadline(now, 59);
        assert_eq!(deadline, now + Duration::seconds(47));
    }

    #[test]
    fn test_has_expired_boundary() {
        let now = Utc.with_ymd_and_hms(2025, 4, 21, 10, 0, 0).unwrap();
        let deadline = now + Duration::seconds(48);

        assert!(!has_expired(deadline, now));
        assert!(!has_expired(deadline, deadline - Duration::seconds(1)));
        assert!(has_expired(deadline, deadline));
        assert!(has_expired(deadline, deadline + Duration::seconds(1)));
    }

    #[test]
    fn test_zero_duration_expires_immediately() {
        let now = Utc.with_ymd_and_hms(2025, 4, 21, 10, 0, 0).unwrap();
        let deadline = compute_deadline(now, 0);
        assert!(has_expired(deadline, now));
    }
}
