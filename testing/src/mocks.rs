//! Deterministic clocks.

use chrono::{DateTime, Duration, Utc};
use helpdesk_core::environment::Clock;
use std::sync::Mutex;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use helpdesk_testing::mocks::FixedClock;
/// use helpdesk_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// Clock that only moves when the test moves it.
///
/// Used for SLA and duration scenarios ("two hours later the ticket is
/// overdue").
#[derive(Debug)]
pub struct ManualClock {
    time: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `time`
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, time: DateTime<Utc>) {
        let mut guard = self
            .time
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = time;
    }

    /// Move forward (or backward, with a negative duration)
    pub fn advance(&self, by: Duration) {
        let mut guard = self
            .time
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .time
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(clock.today().to_string(), "2025-01-01");
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = test_clock().now();
        let clock = ManualClock::new(start);

        clock.advance(Duration::hours(3));
        assert_eq!(clock.now() - start, Duration::hours(3));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
