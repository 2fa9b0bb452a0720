//! Do-not-disturb window arithmetic.
//!
//! Windows are expressed as `HH:mm` wall-clock bounds and evaluated at minute
//! granularity against the offset carried by `now`. A window whose start is
//! later than its end wraps midnight (`22:00`-`08:00`). A window whose start
//! equals its end covers the whole day. Both bounds are inclusive.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use regex::Regex;

use crate::types::Channel;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

static TIME_OF_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time-of-day regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day {0:?}, expected HH:mm")]
pub struct InvalidTimeOfDay(pub String);

/// A wall-clock time with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Whether `value` is a well-formed `HH:mm` string.
    pub fn is_valid(value: &str) -> bool {
        TIME_OF_DAY_RE.is_match(value)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(InvalidTimeOfDay(s.to_string()));
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(TimeOfDay)
            .map_err(|_| InvalidTimeOfDay(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Minutes elapsed since local midnight, ignoring seconds.
pub fn minute_of_day(now: &DateTime<FixedOffset>) -> u32 {
    now.hour() * 60 + now.minute()
}

/// Where `now` sits relative to a configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Disabled,
    Inactive { start: TimeOfDay, end: TimeOfDay },
    Active { minutes_remaining: u32 },
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("do-not-disturb is off"),
            Self::Inactive { start, end } => {
                write!(f, "do-not-disturb scheduled {start}-{end}, not active now")
            }
            Self::Active { minutes_remaining } => {
                let (hours, minutes) = (minutes_remaining / 60, minutes_remaining % 60);
                if hours > 0 {
                    write!(f, "do-not-disturb active, ends in {hours}h {minutes}m")
                } else {
                    write!(f, "do-not-disturb active, ends in {minutes}m")
                }
            }
        }
    }
}

/// A do-not-disturb configuration reduced to parsed bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    pub enabled: bool,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
}

impl QuietWindow {
    pub fn new(enabled: bool, start: Option<TimeOfDay>, end: Option<TimeOfDay>) -> Self {
        Self { enabled, start, end }
    }

    /// Bounds in minutes, or `None` when the window can never be active.
    fn bounds(&self) -> Option<(u32, u32)> {
        match (self.enabled, self.start, self.end) {
            (true, Some(start), Some(end)) => {
                Some((start.minutes_since_midnight(), end.minutes_since_midnight()))
            }
            _ => None,
        }
    }

    pub fn contains_minute(&self, minute: u32) -> bool {
        match self.bounds() {
            None => false,
            Some((start, end)) if start == end => true,
            Some((start, end)) if start < end => start <= minute && minute <= end,
            Some((start, end)) => minute >= start || minute <= end,
        }
    }

    pub fn is_in_window(&self, now: &DateTime<FixedOffset>) -> bool {
        self.contains_minute(minute_of_day(now))
    }

    /// Minutes left until the end bound, or 0 when outside the window.
    /// A full-day window (start == end) is a full day long at its boundary
    /// minute, so the result there is 1440 rather than 0.
    pub fn minutes_until_end(&self, now: &DateTime<FixedOffset>) -> u32 {
        let minute = minute_of_day(now);
        if !self.contains_minute(minute) {
            return 0;
        }
        match self.bounds() {
            Some((start, end)) if start == end && minute == end => MINUTES_PER_DAY,
            Some((_, end)) if minute <= end => end - minute,
            Some((_, end)) => (MINUTES_PER_DAY - minute) + end,
            None => 0,
        }
    }

    pub fn status(&self, now: &DateTime<FixedOffset>) -> WindowStatus {
        match (self.enabled, self.start, self.end) {
            (true, Some(start), Some(end)) => {
                if self.is_in_window(now) {
                    WindowStatus::Active {
                        minutes_remaining: self.minutes_until_end(now),
                    }
                } else {
                    WindowStatus::Inactive { start, end }
                }
            }
            _ => WindowStatus::Disabled,
        }
    }

    /// In-app delivery ignores the window; every other channel is held back
    /// while the window is active.
    pub fn should_send_now(&self, channel: Channel, now: &DateTime<FixedOffset>) -> bool {
        match channel {
            Channel::InApp => true,
            Channel::Email => !self.is_in_window(now),
        }
    }
}
