use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, TimeZone};

/// Source of wall-clock time. Do-not-disturb windows are evaluated against
/// the offset carried by the returned instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Offset in effect at a local wall time on this clock's calendar, used
    /// to place future digest times. Defaults to the current offset.
    fn offset_at(&self, _local: NaiveDateTime) -> FixedOffset {
        *self.now().offset()
    }
}

/// Host local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    // Follows the host zone's daylight-saving rules. A wall time skipped by
    // a forward jump keeps the current offset.
    fn offset_at(&self, local: NaiveDateTime) -> FixedOffset {
        Local
            .offset_from_local_datetime(&local)
            .earliest()
            .unwrap_or_else(|| *self.now().offset())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
