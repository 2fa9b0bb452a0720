//! Fire-time computation for digest queue entries.
//!
//! Both rules return an instant strictly after `now`, so a freshly enqueued
//! entry is never immediately due. The target wall time is placed with the
//! offset `clock` reports for that date, so a daylight-saving change between
//! now and the digest does not shift it.

use chrono::{DateTime, Datelike, Duration, FixedOffset};

use crate::clock::Clock;
use crate::time_window::TimeOfDay;

/// `days_ahead` days after `now`'s local date, at `at`.
fn local_date_at(
    clock: &dyn Clock,
    now: &DateTime<FixedOffset>,
    days_ahead: i64,
    at: TimeOfDay,
) -> DateTime<FixedOffset> {
    let date = now.date_naive() + Duration::days(days_ahead);
    let local = date.and_time(at.as_naive_time());
    let offset = clock.offset_at(local);
    DateTime::from_naive_utc_and_offset(local - offset, offset)
}

/// Next occurrence of `at`: today if still ahead, otherwise tomorrow.
pub fn next_daily(clock: &dyn Clock, now: &DateTime<FixedOffset>, at: TimeOfDay) -> DateTime<FixedOffset> {
    let today = local_date_at(clock, now, 0, at);
    if today <= *now {
        local_date_at(clock, now, 1, at)
    } else {
        today
    }
}

/// Next occurrence of `weekday` (0 = Sunday) at `at`, strictly after `now`.
pub fn next_weekly(
    clock: &dyn Clock,
    now: &DateTime<FixedOffset>,
    weekday: u32,
    at: TimeOfDay,
) -> DateTime<FixedOffset> {
    let current = now.weekday().num_days_from_sunday() as i64;
    let days_until = (weekday as i64 - current).rem_euclid(7);
    let candidate = local_date_at(clock, now, days_until, at);
    if candidate <= *now {
        local_date_at(clock, now, days_until + 7, at)
    } else {
        candidate
    }
}
