//! Time source used by the resolver, the booking services and the scheduler
//!
//! Nothing in the booking lifecycle reads `Utc::now()` directly; it asks the
//! injected [`Clock`] so tests can pin and advance time.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same instant, so a test can keep one handle and hand
/// another to the services under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock forward (or backward with a negative duration)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance(Duration::hours(25));

        assert_eq!(clock.now(), start + Duration::hours(25));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(Utc::now());
        let target = Utc::now() + Duration::days(3);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
