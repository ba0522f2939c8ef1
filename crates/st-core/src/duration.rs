//! Clock-time arithmetic.
//!
//! All clock times carry zero seconds, so only hours and minutes take part in
//! the computation.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Seconds in a calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Returns `end - start` in seconds, adding a day when `end_next_day` is set.
///
/// The result is not clamped: an `end` earlier than `start` on the same day
/// gives a negative number, which validation is expected to reject.
pub fn duration_seconds(start: NaiveTime, end: NaiveTime, end_next_day: bool) -> i64 {
    let hours = i64::from(end.hour()) - i64::from(start.hour());
    let minutes = i64::from(end.minute()) - i64::from(start.minute());
    let same_day = hours * 3600 + minutes * 60;
    if end_next_day {
        SECONDS_PER_DAY + same_day
    } else {
        same_day
    }
}

/// A start time with an end that "may be completed later".
///
/// `end_next_day` is tri-state: `None` means the user has not said yet, which
/// is distinct from `Some(false)`. A span is complete only once both `end` and
/// `end_next_day` are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSpan {
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub end_next_day: Option<bool>,
}

impl ClockSpan {
    pub const fn new(start: NaiveTime, end: Option<NaiveTime>, end_next_day: Option<bool>) -> Self {
        Self {
            start,
            end,
            end_next_day,
        }
    }

    /// Returns true once both `end` and `end_next_day` are set.
    pub const fn is_complete(&self) -> bool {
        self.end.is_some() && self.end_next_day.is_some()
    }

    /// Elapsed seconds, or `None` while the span is incomplete.
    pub fn seconds(&self) -> Option<i64> {
        match (self.end, self.end_next_day) {
            (Some(end), Some(end_next_day)) => {
                Some(duration_seconds(self.start, end, end_next_day))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn end_time_before_midnight() {
        assert_eq!(duration_seconds(hm(11, 11), hm(13, 10), false), 7140);
    }

    #[test]
    fn end_time_after_midnight() {
        assert_eq!(duration_seconds(hm(23, 50), hm(1, 49), true), 7140);
    }

    #[test]
    fn end_before_start_is_negative() {
        assert_eq!(duration_seconds(hm(10, 0), hm(9, 30), false), -1800);
        assert_eq!(duration_seconds(hm(10, 0), hm(10, 0), false), 0);
    }

    #[test]
    fn full_day_when_end_next_day_at_same_time() {
        assert_eq!(duration_seconds(hm(8, 0), hm(8, 0), true), SECONDS_PER_DAY);
    }

    #[test]
    fn span_is_incomplete_without_end_or_flag() {
        let open = ClockSpan::new(hm(9, 0), None, Some(false));
        assert!(!open.is_complete());
        assert_eq!(open.seconds(), None);

        let unset_flag = ClockSpan::new(hm(9, 0), Some(hm(10, 0)), None);
        assert!(!unset_flag.is_complete());
        assert_eq!(unset_flag.seconds(), None);

        let complete = ClockSpan::new(hm(9, 0), Some(hm(10, 0)), Some(false));
        assert!(complete.is_complete());
        assert_eq!(complete.seconds(), Some(3600));
    }
}
