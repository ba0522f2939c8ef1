//! Circular time-of-day histogram of session intervals.
//!
//! A day is split into `24 * steps_per_hour` buckets. Each complete interval
//! marks every bucket it covers, wrapping through midnight when it ends on
//! the next day. Intervals are accumulated into a difference array and a
//! single prefix sum turns it into per-bucket counts, so building costs
//! O(intervals + buckets).

use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use thiserror::Error;

use crate::duration::ClockSpan;
use crate::ratio::round_half_even;

/// Steps per hour used by the dashboard when nothing else is configured.
pub const DEFAULT_STEPS_PER_HOUR: u32 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistogramError {
    #[error("steps per hour must be a positive divisor of 60, got {0}")]
    InvalidResolution(u32),
}

/// A validated bucket resolution: a positive divisor of 60 steps per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Resolution(u32);

impl Resolution {
    pub const fn new(steps_per_hour: u32) -> Result<Self, HistogramError> {
        if steps_per_hour == 0 || 60 % steps_per_hour != 0 {
            return Err(HistogramError::InvalidResolution(steps_per_hour));
        }
        Ok(Self(steps_per_hour))
    }

    pub const fn steps_per_hour(self) -> u32 {
        self.0
    }

    /// Minutes covered by one bucket.
    pub const fn minutes_per_step(self) -> u32 {
        60 / self.0
    }

    /// Number of buckets in a day.
    pub const fn buckets(self) -> usize {
        (self.0 * 24) as usize
    }

    /// Maps a clock time to its bucket.
    ///
    /// The minute offset is rounded half-to-even to the nearest step. The
    /// returned flag is true when that rounding carried the time past the
    /// last bucket back to bucket 0 (e.g. 23:59 at 4 steps per hour).
    pub fn time_to_idx(self, time: NaiveTime) -> (bool, usize) {
        let steps = i64::from(self.0);
        let minute_steps = round_half_even(i64::from(time.minute()) * steps, 60);
        let idx = i64::from(time.hour()) * steps + minute_steps;
        let per_day = steps * 24;
        let overflow = idx >= per_day;
        // idx < 2 * per_day, so the remainder always fits.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bucket = idx.rem_euclid(per_day) as usize;
        (overflow, bucket)
    }

    /// Axis labels: `"9h"` on the hour, `"9h15"` within it.
    pub fn labels(self) -> Vec<String> {
        let minutes_per_step = self.minutes_per_step();
        (0..self.0 * 24)
            .map(|step| {
                let hour = step / self.0;
                let n_step = step % self.0;
                if n_step > 0 {
                    format!("{hour}h{}", n_step * minutes_per_step)
                } else {
                    format!("{hour}h")
                }
            })
            .collect()
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self(DEFAULT_STEPS_PER_HOUR)
    }
}

/// Builds the per-bucket frequency list for the given intervals.
///
/// Incomplete intervals are ignored. The result has `24 * steps_per_hour`
/// entries.
pub fn build_histogram<I>(intervals: I, steps_per_hour: u32) -> Result<Vec<i64>, HistogramError>
where
    I: IntoIterator<Item = ClockSpan>,
{
    let resolution = Resolution::new(steps_per_hour)?;
    Ok(histogram(intervals, resolution))
}

/// Same as [`build_histogram`] for an already validated resolution.
pub fn histogram<I>(intervals: I, resolution: Resolution) -> Vec<i64>
where
    I: IntoIterator<Item = ClockSpan>,
{
    let buckets = resolution.buckets();
    let mut diff = vec![0_i64; buckets];

    for span in intervals {
        let (Some(end), Some(end_next_day)) = (span.end, span.end_next_day) else {
            continue;
        };

        if end_next_day {
            diff[0] += 1;
        }

        let (_, start_idx) = resolution.time_to_idx(span.start);
        diff[start_idx] += 1;

        let (end_overflow, end_idx) = resolution.time_to_idx(end);
        if end_idx + 1 < buckets {
            diff[end_idx + 1] -= 1;
        }
        if end_overflow {
            diff[0] += 1;
        }
    }

    let mut running = 0;
    for slot in &mut diff {
        running += *slot;
        *slot = running;
    }
    diff
}

/// Histogram paired with its axis labels, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub steps_per_hour: u32,
    pub labels: Vec<String>,
    pub counts: Vec<i64>,
}

impl Histogram {
    pub fn build<I>(intervals: I, resolution: Resolution) -> Self
    where
        I: IntoIterator<Item = ClockSpan>,
    {
        Self {
            steps_per_hour: resolution.steps_per_hour(),
            labels: resolution.labels(),
            counts: histogram(intervals, resolution),
        }
    }

    /// Largest bucket count, or 0 when empty.
    pub fn peak(&self) -> i64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
