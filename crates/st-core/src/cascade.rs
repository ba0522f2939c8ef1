//! Cascade planning for the aggregate rollups.
//!
//! Each save or delete of a record changes what that record contributes to
//! its parent(s). The planners here take the previously stored snapshot (or
//! `None` when creating) and the new candidate, and return the [`Shift`]s the
//! storage layer must apply to each parent. Applying a shift to a parent is
//! itself a save of that parent, so the storage layer recurses until it
//! reaches the User.
//!
//! Contribution edges:
//!
//! | child   | parent(s)      | contribution                                       |
//! |---------|----------------|----------------------------------------------------|
//! | Session | Day, Subject   | `duration`, one session                            |
//! | Day     | Stage          | worktime, usable/study time, its sessions, one day |
//! | Stage   | User           | its totals and counts, one stage                   |
//! | Subject | User           | one subject (its times already reach the User via Stage) |

use std::ops::{Add, AddAssign, Neg, Sub};

use serde::Serialize;

use crate::model::{Day, Session, Stage, Subject, User};
use crate::types::{DayId, StageId, SubjectId, UserId};

/// The times and counts one record contributes to a parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub usable_time: i64,
    pub study_time: i64,
    pub work_time: i64,
    pub stage_count: i64,
    pub day_count: i64,
    pub session_count: i64,
    pub subject_count: i64,
}

impl Tally {
    pub const ZERO: Self = Self {
        usable_time: 0,
        study_time: 0,
        work_time: 0,
        stage_count: 0,
        day_count: 0,
        session_count: 0,
        subject_count: 0,
    };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for Tally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            usable_time: self.usable_time + rhs.usable_time,
            study_time: self.study_time + rhs.study_time,
            work_time: self.work_time + rhs.work_time,
            stage_count: self.stage_count + rhs.stage_count,
            day_count: self.day_count + rhs.day_count,
            session_count: self.session_count + rhs.session_count,
            subject_count: self.subject_count + rhs.subject_count,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Tally {
    type Output = Self;

    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl Sub for Tally {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            usable_time: self.usable_time - rhs.usable_time,
            study_time: self.study_time - rhs.study_time,
            work_time: self.work_time - rhs.work_time,
            stage_count: self.stage_count - rhs.stage_count,
            day_count: self.day_count - rhs.day_count,
            session_count: self.session_count - rhs.session_count,
            subject_count: self.subject_count - rhs.subject_count,
        }
    }
}

/// A delta to add to one parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift<P> {
    pub parent: P,
    pub delta: Tally,
}

/// Whether a delete should adjust a parent, or leave it alone because that
/// parent is itself being removed by the same cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentUpdate {
    Apply,
    Skip,
}

/// Moves a contribution from `prev` to `next`.
///
/// - create (`None` → parent): the full new contribution is added;
/// - same parent: only the difference is applied, even when it is zero, so
///   the parent is still re-saved;
/// - parent changed: the old contribution leaves the old parent in full and
///   the new contribution enters the new parent in full;
/// - delete (parent → `None`): the old contribution is subtracted.
pub fn reparent<P: Copy + PartialEq>(
    prev: Option<(P, Tally)>,
    next: Option<(P, Tally)>,
) -> Vec<Shift<P>> {
    match (prev, next) {
        (None, None) => Vec::new(),
        (None, Some((parent, after))) => vec![Shift {
            parent,
            delta: after,
        }],
        (Some((parent, before)), None) => vec![Shift {
            parent,
            delta: -before,
        }],
        (Some((old, before)), Some((new, after))) if old == new => vec![Shift {
            parent: new,
            delta: after - before,
        }],
        (Some((old, before)), Some((new, after))) => vec![
            Shift {
                parent: old,
                delta: -before,
            },
            Shift {
                parent: new,
                delta: after,
            },
        ],
    }
}

/// Something whose cached rollups absorb a child's delta.
pub trait Rollup {
    fn absorb(&mut self, delta: &Tally);
}

impl Rollup for Day {
    fn absorb(&mut self, delta: &Tally) {
        self.study_time += delta.study_time;
        self.session_count += delta.session_count;
    }
}

impl Rollup for Subject {
    fn absorb(&mut self, delta: &Tally) {
        self.total_study_time += delta.study_time;
        self.session_count += delta.session_count;
    }
}

impl Rollup for Stage {
    fn absorb(&mut self, delta: &Tally) {
        self.total_usable_time += delta.usable_time;
        self.total_study_time += delta.study_time;
        self.total_work_time += delta.work_time;
        self.day_count += delta.day_count;
        self.session_count += delta.session_count;
    }
}

impl Rollup for User {
    fn absorb(&mut self, delta: &Tally) {
        self.total_usable_time += delta.usable_time;
        self.total_study_time += delta.study_time;
        self.total_work_time += delta.work_time;
        self.stage_count += delta.stage_count;
        self.day_count += delta.day_count;
        self.session_count += delta.session_count;
        self.subject_count += delta.subject_count;
    }
}

impl Session {
    /// Contribution to both the Day and the Subject.
    pub const fn tally(&self) -> Tally {
        Tally {
            study_time: self.duration,
            session_count: 1,
            ..Tally::ZERO
        }
    }
}

impl Day {
    /// Contribution to the Stage.
    pub const fn tally(&self) -> Tally {
        Tally {
            usable_time: self.usable_time,
            study_time: self.study_time,
            work_time: self.worktime,
            day_count: 1,
            session_count: self.session_count,
            ..Tally::ZERO
        }
    }
}

impl Stage {
    /// Contribution to the User.
    pub const fn tally(&self) -> Tally {
        Tally {
            usable_time: self.total_usable_time,
            study_time: self.total_study_time,
            work_time: self.total_work_time,
            stage_count: 1,
            day_count: self.day_count,
            session_count: self.session_count,
            subject_count: 0,
        }
    }
}

impl Subject {
    /// Contribution to the User: the subject itself, never its times.
    pub const fn tally(&self) -> Tally {
        Tally {
            subject_count: 1,
            ..Tally::ZERO
        }
    }
}

/// Parent shifts for one Session mutation; Day and Subject edges are
/// planned independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPlan {
    pub days: Vec<Shift<DayId>>,
    pub subjects: Vec<Shift<SubjectId>>,
}

pub fn plan_session_save(prev: Option<&Session>, next: &Session) -> SessionPlan {
    SessionPlan {
        days: reparent(
            prev.map(|session| (session.day_id, session.tally())),
            Some((next.day_id, next.tally())),
        ),
        subjects: reparent(
            prev.map(|session| (session.subject_id, session.tally())),
            Some((next.subject_id, next.tally())),
        ),
    }
}

pub fn plan_session_delete(
    session: &Session,
    day: ParentUpdate,
    subject: ParentUpdate,
) -> SessionPlan {
    let days = match day {
        ParentUpdate::Apply => reparent(Some((session.day_id, session.tally())), None),
        ParentUpdate::Skip => Vec::new(),
    };
    let subjects = match subject {
        ParentUpdate::Apply => reparent(Some((session.subject_id, session.tally())), None),
        ParentUpdate::Skip => Vec::new(),
    };
    SessionPlan { days, subjects }
}

pub fn plan_day_save(prev: Option<&Day>, next: &Day) -> Vec<Shift<StageId>> {
    reparent(
        prev.map(|day| (day.stage_id, day.tally())),
        Some((next.stage_id, next.tally())),
    )
}

pub fn plan_day_delete(day: &Day, stage: ParentUpdate) -> Vec<Shift<StageId>> {
    match stage {
        ParentUpdate::Apply => reparent(Some((day.stage_id, day.tally())), None),
        ParentUpdate::Skip => Vec::new(),
    }
}

pub fn plan_stage_save(prev: Option<&Stage>, next: &Stage) -> Vec<Shift<UserId>> {
    reparent(
        prev.map(|stage| (stage.user_id, stage.tally())),
        Some((next.user_id, next.tally())),
    )
}

pub fn plan_stage_delete(stage: &Stage) -> Vec<Shift<UserId>> {
    reparent(Some((stage.user_id, stage.tally())), None)
}

pub fn plan_subject_save(prev: Option<&Subject>, next: &Subject) -> Vec<Shift<UserId>> {
    reparent(
        prev.map(|subject| (subject.user_id, subject.tally())),
        Some((next.user_id, next.tally())),
    )
}

pub fn plan_subject_delete(subject: &Subject) -> Vec<Shift<UserId>> {
    reparent(Some((subject.user_id, subject.tally())), None)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::model::{NewDay, NewSession, NewStage, NewSubject};
    use crate::types::SessionId;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn session(day: i64, subject: i64, end: Option<NaiveTime>) -> Session {
        let mut session = Session::draft(
            UserId::new(1),
            NewSession {
                day_id: DayId::new(day),
                subject_id: SubjectId::new(subject),
                start: hm(21, 10),
                end,
                end_next_day: Some(false),
            },
        );
        session.id = SessionId::new(7);
        session
    }

    fn day(stage: i64) -> Day {
        let mut day = Day::draft(
            UserId::new(1),
            NewDay {
                stage_id: StageId::new(stage),
                day: NaiveDate::from_ymd_opt(2022, 5, 6).unwrap(),
                worktime: 3600,
                start: hm(14, 10),
                end: Some(hm(2, 10)),
                end_next_day: Some(true),
                comment: None,
            },
        );
        day.id = DayId::new(3);
        day
    }

    #[test]
    fn reparent_covers_every_transition() {
        let a = Tally {
            study_time: 10,
            session_count: 1,
            ..Tally::ZERO
        };
        let b = Tally {
            study_time: 25,
            session_count: 1,
            ..Tally::ZERO
        };

        assert!(reparent::<i64>(None, None).is_empty());
        assert_eq!(
            reparent(None, Some((1, a))),
            vec![Shift {
                parent: 1,
                delta: a
            }]
        );
        assert_eq!(
            reparent(Some((1, a)), None),
            vec![Shift {
                parent: 1,
                delta: -a
            }]
        );
        assert_eq!(
            reparent(Some((1, a)), Some((1, b))),
            vec![Shift {
                parent: 1,
                delta: Tally {
                    study_time: 15,
                    ..Tally::ZERO
                }
            }]
        );
        assert_eq!(
            reparent(Some((1, a)), Some((2, b))),
            vec![
                Shift {
                    parent: 1,
                    delta: -a
                },
                Shift {
                    parent: 2,
                    delta: b
                },
            ]
        );
    }

    #[test]
    fn session_create_adds_duration_and_count_to_both_parents() {
        let next = session(1, 1, Some(hm(23, 10)));
        let plan = plan_session_save(None, &next);

        let expected = Tally {
            study_time: 7200,
            session_count: 1,
            ..Tally::ZERO
        };
        assert_eq!(
            plan.days,
            vec![Shift {
                parent: DayId::new(1),
                delta: expected
            }]
        );
        assert_eq!(
            plan.subjects,
            vec![Shift {
                parent: SubjectId::new(1),
                delta: expected
            }]
        );
    }

    #[test]
    fn open_session_counts_without_time() {
        let next = session(1, 1, None);
        let plan = plan_session_save(None, &next);
        assert_eq!(plan.days[0].delta.study_time, 0);
        assert_eq!(plan.days[0].delta.session_count, 1);
        assert_eq!(plan.subjects[0].delta.session_count, 1);
    }

    #[test]
    fn identical_session_update_is_a_zero_shift() {
        let prev = session(1, 1, Some(hm(23, 10)));
        let plan = plan_session_save(Some(&prev), &prev.clone());
        assert!(plan.days.iter().all(|shift| shift.delta.is_zero()));
        assert!(plan.subjects.iter().all(|shift| shift.delta.is_zero()));
    }

    #[test]
    fn session_move_changes_only_the_moved_parent_in_full() {
        let prev = session(1, 1, Some(hm(23, 10)));
        let mut next = prev.clone();
        next.day_id = DayId::new(2);
        next.end = Some(hm(22, 10));
        next.refresh();

        let plan = plan_session_save(Some(&prev), &next);

        assert_eq!(plan.days.len(), 2);
        assert_eq!(plan.days[0].parent, DayId::new(1));
        assert_eq!(plan.days[0].delta.study_time, -7200);
        assert_eq!(plan.days[0].delta.session_count, -1);
        assert_eq!(plan.days[1].parent, DayId::new(2));
        assert_eq!(plan.days[1].delta.study_time, 3600);
        assert_eq!(plan.days[1].delta.session_count, 1);

        // Subject unchanged: only the duration delta, no count change.
        assert_eq!(plan.subjects.len(), 1);
        assert_eq!(plan.subjects[0].delta.study_time, -3600);
        assert_eq!(plan.subjects[0].delta.session_count, 0);
    }

    #[test]
    fn session_delete_skips_parents_being_removed() {
        let doomed = session(1, 1, Some(hm(23, 10)));

        let plan = plan_session_delete(&doomed, ParentUpdate::Skip, ParentUpdate::Apply);
        assert!(plan.days.is_empty());
        assert_eq!(plan.subjects[0].delta.study_time, -7200);
        assert_eq!(plan.subjects[0].delta.session_count, -1);

        let plan = plan_session_delete(&doomed, ParentUpdate::Apply, ParentUpdate::Skip);
        assert_eq!(plan.days[0].delta.session_count, -1);
        assert!(plan.subjects.is_empty());
    }

    #[test]
    fn day_create_counts_one_day() {
        let next = day(1);
        let shifts = plan_day_save(None, &next);
        assert_eq!(
            shifts,
            vec![Shift {
                parent: StageId::new(1),
                delta: Tally {
                    usable_time: 11 * 3600,
                    work_time: 3600,
                    day_count: 1,
                    ..Tally::ZERO
                }
            }]
        );
    }

    #[test]
    fn day_stage_change_moves_stored_contribution() {
        let mut prev = day(1);
        prev.study_time = 1800;
        prev.session_count = 2;
        prev.refresh();

        let mut next = prev.clone();
        next.stage_id = StageId::new(2);
        next.worktime = 0;
        next.refresh();

        let shifts = plan_day_save(Some(&prev), &next);
        assert_eq!(shifts[0].parent, StageId::new(1));
        assert_eq!(shifts[0].delta, -prev.tally());
        assert_eq!(shifts[0].delta.day_count, -1);
        assert_eq!(shifts[1].parent, StageId::new(2));
        assert_eq!(shifts[1].delta.usable_time, 12 * 3600);
        assert_eq!(shifts[1].delta.study_time, 1800);
        assert_eq!(shifts[1].delta.session_count, 2);
        assert_eq!(shifts[1].delta.day_count, 1);
    }

    #[test]
    fn day_delete_respects_stage_removal() {
        let doomed = day(1);
        assert!(plan_day_delete(&doomed, ParentUpdate::Skip).is_empty());
        let shifts = plan_day_delete(&doomed, ParentUpdate::Apply);
        assert_eq!(shifts[0].delta, -doomed.tally());
    }

    #[test]
    fn stage_create_then_delete_cancel_out() {
        let mut stage = Stage::draft(
            UserId::new(1),
            NewStage {
                name: "Stage".to_string(),
                description: None,
            },
        );
        let created = plan_stage_save(None, &stage);
        assert_eq!(created[0].delta.stage_count, 1);

        stage.absorb(&day(1).tally());
        let deleted = plan_stage_delete(&stage);
        assert_eq!(deleted[0].delta.stage_count, -1);
        assert_eq!(deleted[0].delta.day_count, -1);
        assert_eq!(deleted[0].delta.usable_time, -11 * 3600);
    }

    #[test]
    fn subject_only_counts_itself_toward_user() {
        let mut subject = Subject::draft(
            UserId::new(1),
            NewSubject {
                name: "CS".to_string(),
                description: None,
            },
        );
        assert_eq!(
            plan_subject_save(None, &subject)[0].delta,
            Tally {
                subject_count: 1,
                ..Tally::ZERO
            }
        );

        let prev = subject.clone();
        subject.absorb(&session(1, 1, Some(hm(23, 10))).tally());
        assert_eq!(subject.total_study_time, 7200);
        let update = plan_subject_save(Some(&prev), &subject);
        assert!(update[0].delta.is_zero());

        assert_eq!(plan_subject_delete(&subject)[0].delta.subject_count, -1);
    }
}
