//! The aggregate entity graph: User → Stage → Day → Session, with Subject
//! as a second rollup of Sessions.
//!
//! Every entity carries its raw fields next to the derived rollups. The
//! `refresh*` methods recompute the fields derived from a record's own values;
//! rollups fed by children only change through [`crate::cascade`].

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::duration::ClockSpan;
use crate::ratio::Ratio;
use crate::types::{DayId, SessionId, StageId, SubjectId, UserId};

/// A registered user and the totals of everything they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub total_usable_time: i64,
    pub total_study_time: i64,
    pub total_work_time: i64,
    pub stage_count: i64,
    pub day_count: i64,
    pub session_count: i64,
    pub subject_count: i64,
    pub time_usage_ratio: Ratio,
}

impl User {
    /// Builds a fresh, unsaved user with every counter at zero.
    pub fn draft(new: NewUser) -> Self {
        Self {
            id: UserId::UNSAVED,
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            total_usable_time: 0,
            total_study_time: 0,
            total_work_time: 0,
            stage_count: 0,
            day_count: 0,
            session_count: 0,
            subject_count: 0,
            time_usage_ratio: Ratio::ZERO,
        }
    }

    pub const fn refresh_ratio(&mut self) {
        self.time_usage_ratio = Ratio::of(self.total_study_time, self.total_usable_time);
    }
}

/// Registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile edits. Totals are read-only to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
    }
}

/// A named period (e.g. an academic term) aggregating Days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub id: StageId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub day_count: i64,
    pub session_count: i64,
    pub total_usable_time: i64,
    pub total_study_time: i64,
    pub total_work_time: i64,
    pub time_usage_ratio: Ratio,
}

impl Stage {
    pub fn draft(user_id: UserId, new: NewStage) -> Self {
        Self {
            id: StageId::UNSAVED,
            user_id,
            name: new.name,
            description: new.description,
            day_count: 0,
            session_count: 0,
            total_usable_time: 0,
            total_study_time: 0,
            total_work_time: 0,
            time_usage_ratio: Ratio::ZERO,
        }
    }

    pub const fn refresh_ratio(&mut self) {
        self.time_usage_ratio = Ratio::of(self.total_study_time, self.total_usable_time);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStage {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl StageChanges {
    pub fn apply(self, stage: &mut Stage) {
        if let Some(name) = self.name {
            stage.name = name;
        }
        if let Some(description) = self.description {
            stage.description = description;
        }
    }
}

/// One calendar day's time budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Day {
    pub id: DayId,
    pub user_id: UserId,
    pub stage_id: StageId,
    pub day: NaiveDate,
    /// ISO weekday, Monday = 1 through Sunday = 7.
    pub day_of_week: u32,
    pub session_count: i64,
    pub worktime: i64,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub end_next_day: Option<bool>,
    pub usable_time: i64,
    pub study_time: i64,
    pub time_usage_ratio: Ratio,
    pub comment: Option<String>,
}

impl Day {
    /// Builds an unsaved day with its derived fields already computed.
    pub fn draft(user_id: UserId, new: NewDay) -> Self {
        let mut day = Self {
            id: DayId::UNSAVED,
            user_id,
            stage_id: new.stage_id,
            day: new.day,
            day_of_week: 0,
            session_count: 0,
            worktime: new.worktime,
            start: new.start,
            end: new.end,
            end_next_day: new.end_next_day,
            usable_time: 0,
            study_time: 0,
            time_usage_ratio: Ratio::ZERO,
            comment: new.comment,
        };
        day.refresh();
        day
    }

    pub const fn span(&self) -> ClockSpan {
        ClockSpan::new(self.start, self.end, self.end_next_day)
    }

    /// Recomputes `day_of_week`, `usable_time` and `time_usage_ratio`.
    ///
    /// `study_time` is left alone: it only moves with Session cascades.
    pub fn refresh(&mut self) {
        self.day_of_week = self.day.weekday().number_from_monday();
        self.usable_time = self
            .span()
            .seconds()
            .map_or(0, |seconds| seconds - self.worktime);
        self.time_usage_ratio = Ratio::of(self.study_time, self.usable_time);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDay {
    pub stage_id: StageId,
    pub day: NaiveDate,
    pub worktime: i64,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub end_next_day: Option<bool>,
    pub comment: Option<String>,
}

/// Edits to a Day's own fields. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayChanges {
    pub stage_id: Option<StageId>,
    pub day: Option<NaiveDate>,
    pub worktime: Option<i64>,
    pub start: Option<NaiveTime>,
    pub end: Option<Option<NaiveTime>>,
    pub end_next_day: Option<Option<bool>>,
    pub comment: Option<Option<String>>,
}

impl DayChanges {
    pub fn apply(self, day: &mut Day) {
        if let Some(stage_id) = self.stage_id {
            day.stage_id = stage_id;
        }
        if let Some(date) = self.day {
            day.day = date;
        }
        if let Some(worktime) = self.worktime {
            day.worktime = worktime;
        }
        if let Some(start) = self.start {
            day.start = start;
        }
        if let Some(end) = self.end {
            day.end = end;
        }
        if let Some(end_next_day) = self.end_next_day {
            day.end_next_day = end_next_day;
        }
        if let Some(comment) = self.comment {
            day.comment = comment;
        }
    }
}

/// A timed interval of study or work against a Subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub day_id: DayId,
    pub subject_id: SubjectId,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub end_next_day: Option<bool>,
    pub duration: i64,
}

impl Session {
    pub fn draft(user_id: UserId, new: NewSession) -> Self {
        let mut session = Self {
            id: SessionId::UNSAVED,
            user_id,
            day_id: new.day_id,
            subject_id: new.subject_id,
            start: new.start,
            end: new.end,
            end_next_day: new.end_next_day,
            duration: 0,
        };
        session.refresh();
        session
    }

    pub const fn span(&self) -> ClockSpan {
        ClockSpan::new(self.start, self.end, self.end_next_day)
    }

    /// Recomputes `duration`; an incomplete session lasts zero seconds.
    pub fn refresh(&mut self) {
        self.duration = self.span().seconds().unwrap_or(0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub day_id: DayId,
    pub subject_id: SubjectId,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub end_next_day: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionChanges {
    pub day_id: Option<DayId>,
    pub subject_id: Option<SubjectId>,
    pub start: Option<NaiveTime>,
    pub end: Option<Option<NaiveTime>>,
    pub end_next_day: Option<Option<bool>>,
}

impl SessionChanges {
    pub fn apply(self, session: &mut Session) {
        if let Some(day_id) = self.day_id {
            session.day_id = day_id;
        }
        if let Some(subject_id) = self.subject_id {
            session.subject_id = subject_id;
        }
        if let Some(start) = self.start {
            session.start = start;
        }
        if let Some(end) = self.end {
            session.end = end;
        }
        if let Some(end_next_day) = self.end_next_day {
            session.end_next_day = end_next_day;
        }
    }
}

/// A topic rolling up Sessions independently of Stage/Day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: SubjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub total_study_time: i64,
    pub session_count: i64,
}

impl Subject {
    pub fn draft(user_id: UserId, new: NewSubject) -> Self {
        Self {
            id: SubjectId::UNSAVED,
            user_id,
            name: new.name,
            description: new.description,
            total_study_time: 0,
            session_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl SubjectChanges {
    pub fn apply(self, subject: &mut Subject) {
        if let Some(name) = self.name {
            subject.name = name;
        }
        if let Some(description) = self.description {
            subject.description = description;
        }
    }
}
