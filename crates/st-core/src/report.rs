//! Read-only summaries shown by the dashboard and the detail views.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::histogram::Histogram;
use crate::model::{Stage, Subject, User};
use crate::ratio::{Ratio, round_half_even};

/// Formats a duration as `"{h}h, {m}min"`, dropping leftover seconds.
///
/// Negative input is treated as zero.
pub fn format_hours_minutes(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    format!("{}h, {}min", minutes / 60, minutes % 60)
}

/// A quantity with one decimal place, held as a count of tenths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tenths(i64);

impl Tenths {
    /// Rounds `numerator / denominator` half-to-even to one decimal place.
    /// A zero denominator yields zero.
    pub const fn of(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self(0);
        }
        Self(round_half_even(numerator * 10, denominator))
    }

    /// Seconds expressed in hours.
    pub const fn hours(seconds: i64) -> Self {
        Self::of(seconds, 3600)
    }

    pub const fn tenths(self) -> i64 {
        self.0
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", magnitude / 10, magnitude % 10)
    }
}

impl Serialize for Tenths {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_f64().serialize(serializer)
    }
}

/// How a user's logged days split into work, study, idle usable time and the
/// rest, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeDistribution {
    pub work: Tenths,
    pub study: Tenths,
    pub non_study: Tenths,
    pub inactive: Tenths,
}

impl TimeDistribution {
    /// Each share is rounded to one decimal before the derived ones are
    /// computed from it, so the four always add up to `day_count * 24`.
    pub const fn for_user(user: &User) -> Self {
        let work = Tenths::hours(user.total_work_time).tenths();
        let study = Tenths::hours(user.total_study_time).tenths();
        let usable = Tenths::hours(user.total_usable_time).tenths();
        let non_study = if usable > study { usable - study } else { 0 };
        let inactive = user.day_count * 240 - study - non_study - work;
        Self {
            work: Tenths(work),
            study: Tenths(study),
            non_study: Tenths(non_study),
            inactive: Tenths(inactive),
        }
    }

    /// `(label, hours)` pairs in chart order.
    pub fn entries(&self) -> [(&'static str, Tenths); 4] {
        [
            ("Work time (h)", self.work),
            ("Study time (h)", self.study),
            ("Non study time (h)", self.non_study),
            ("Inactive time (h)", self.inactive),
        ]
    }
}

/// Maxima over a set of Days (a user's, or one Stage's), used to scale bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayMaxima {
    pub max_usable_time: i64,
    pub max_study_time: i64,
    pub max_time_usage_ratio: Ratio,
}

/// Per-day averages of one Stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub avg_usable_time: i64,
    pub avg_study_time: i64,
    pub avg_sessions_per_day: Tenths,
    pub avg_session_time: i64,
}

impl StageSummary {
    pub const fn of(stage: &Stage) -> Self {
        Self {
            avg_usable_time: average(stage.total_usable_time, stage.day_count),
            avg_study_time: average(stage.total_study_time, stage.day_count),
            avg_sessions_per_day: Tenths::of(stage.session_count, stage.day_count),
            avg_session_time: average(stage.total_study_time, stage.session_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectSummary {
    pub avg_session_time: i64,
}

impl SubjectSummary {
    pub const fn of(subject: &Subject) -> Self {
        Self {
            avg_session_time: average(subject.total_study_time, subject.session_count),
        }
    }
}

/// Everything the dashboard shows for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub username: String,
    pub time_usage_ratio: Ratio,
    pub distribution: TimeDistribution,
    pub maxima: DayMaxima,
    pub histogram: Histogram,
}

impl Dashboard {
    pub fn new(user: &User, maxima: DayMaxima, histogram: Histogram) -> Self {
        Self {
            username: user.username.clone(),
            time_usage_ratio: user.time_usage_ratio,
            distribution: TimeDistribution::for_user(user),
            maxima,
            histogram,
        }
    }
}

const fn average(total: i64, count: i64) -> i64 {
    if count == 0 { 0 } else { total / count }
}
