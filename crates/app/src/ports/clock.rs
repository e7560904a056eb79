//! Clock port.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Duration;

use cropcloud_domain::time::{self, Timestamp};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }
}

/// Clock that only moves when told to. Clones share the same offset, so a
/// test can keep a handle and advance the time a service sees.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Timestamp,
    offset_secs: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            base: start,
            offset_secs: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance(Duration::hours(hours));
    }

    pub fn set(&self, at: Timestamp) {
        self.offset_secs
            .store((at - self.base).num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.base + Duration::seconds(self.offset_secs.load(Ordering::SeqCst))
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcloud_domain::time::parse_timestamp;

    #[test]
    fn should_share_offset_between_clones() {
        let clock = ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        let handle = clock.clone();
        handle.advance_hours(49);
        assert_eq!(clock.now(), parse_timestamp("2024-01-03T01:00:00Z").unwrap());
    }

    #[test]
    fn should_jump_to_set_time() {
        let clock = ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        clock.set(parse_timestamp("2023-12-31T00:00:00Z").unwrap());
        assert_eq!(clock.now(), parse_timestamp("2023-12-31T00:00:00Z").unwrap());
    }
}
