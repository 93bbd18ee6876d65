//! Environment traits injected into services.
//!
//! All time-dependent rules (SLA deadlines, warranty windows, frozen duration
//! counters) read the current instant through [`Clock`] so tests can pin it.

use chrono::{DateTime, NaiveDate, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use helpdesk_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.now() <= chrono::Utc::now());
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Get the current calendar day (UTC)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
