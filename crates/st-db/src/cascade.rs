//! Applies the aggregate cascade to stored rows.
//!
//! Every `save_*` reads the stored row (when there is one) strictly before
//! writing the new one, asks [`st_core::cascade`] which parents must move,
//! and saves those parents in turn. The recursion stops at the User.

use rusqlite::Connection;
use st_core::cascade::{
    plan_day_delete, plan_day_save, plan_session_delete, plan_session_save, plan_stage_delete,
    plan_stage_save, plan_subject_delete, plan_subject_save,
};
use st_core::{
    Day, DayId, ParentUpdate, Rollup, RowId, Session, SessionPlan, Shift, Stage, StageId, Subject,
    SubjectId, User, UserId,
};
use tracing::debug;

use crate::DbError;
use crate::rows;

/// The cascade bound to one open transaction.
pub struct Cascade<'c> {
    conn: &'c Connection,
}

impl<'c> Cascade<'c> {
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub const fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Persists a user after recomputing its ratio.
    pub fn save_user(&self, user: &mut User) -> Result<(), DbError> {
        user.refresh_ratio();
        if user.id.is_unsaved() {
            user.id = rows::insert_user(self.conn, user)?;
        } else {
            rows::update_user(self.conn, user)?;
        }
        debug!(user = %user.id, ratio = %user.time_usage_ratio, "saved user");
        Ok(())
    }

    pub fn save_stage(&self, stage: &mut Stage) -> Result<(), DbError> {
        let prev = self.stored(stage.id, rows::require_stage)?;
        stage.refresh_ratio();
        if stage.id.is_unsaved() {
            stage.id = rows::insert_stage(self.conn, stage)?;
        } else {
            rows::update_stage(self.conn, stage)?;
        }
        debug!(stage = %stage.id, ratio = %stage.time_usage_ratio, "saved stage");
        for shift in plan_stage_save(prev.as_ref(), stage) {
            self.shift_user(shift)?;
        }
        Ok(())
    }

    pub fn save_subject(&self, subject: &mut Subject) -> Result<(), DbError> {
        let prev = self.stored(subject.id, rows::require_subject)?;
        if subject.id.is_unsaved() {
            subject.id = rows::insert_subject(self.conn, subject)?;
        } else {
            rows::update_subject(self.conn, subject)?;
        }
        debug!(subject = %subject.id, "saved subject");
        for shift in plan_subject_save(prev.as_ref(), subject) {
            self.shift_user(shift)?;
        }
        Ok(())
    }

    /// Persists a day after recomputing its derived fields.
    ///
    /// `study_time` and `session_count` are taken as given: they only change
    /// through [`Self::shift_day`].
    pub fn save_day(&self, day: &mut Day) -> Result<(), DbError> {
        let prev = self.stored(day.id, rows::require_day)?;
        day.refresh();
        if day.id.is_unsaved() {
            day.id = rows::insert_day(self.conn, day)?;
        } else {
            rows::update_day(self.conn, day)?;
        }
        debug!(
            day = %day.id,
            usable_time = day.usable_time,
            study_time = day.study_time,
            "saved day"
        );
        for shift in plan_day_save(prev.as_ref(), day) {
            self.shift_stage(shift)?;
        }
        Ok(())
    }

    pub fn save_session(&self, session: &mut Session) -> Result<(), DbError> {
        let prev = self.stored(session.id, rows::require_session)?;
        session.refresh();
        if session.id.is_unsaved() {
            session.id = rows::insert_session(self.conn, session)?;
        } else {
            rows::update_session(self.conn, session)?;
        }
        debug!(session = %session.id, duration = session.duration, "saved session");
        self.apply_session_plan(plan_session_save(prev.as_ref(), session))
    }

    /// Deletes a session, adjusting each parent unless told it is going away.
    pub fn remove_session(
        &self,
        session: &Session,
        day: ParentUpdate,
        subject: ParentUpdate,
    ) -> Result<(), DbError> {
        debug!(session = %session.id, ?day, ?subject, "removing session");
        self.apply_session_plan(plan_session_delete(session, day, subject))?;
        rows::delete_row(self.conn, "sessions", session.id)
    }

    /// Deletes a day and its sessions.
    pub fn remove_day(&self, day: &Day, stage: ParentUpdate) -> Result<(), DbError> {
        debug!(day = %day.id, ?stage, "removing day");
        for session in rows::sessions_of_day(self.conn, day.id)? {
            self.remove_session(&session, ParentUpdate::Skip, ParentUpdate::Apply)?;
        }
        for shift in plan_day_delete(day, stage) {
            self.shift_stage(shift)?;
        }
        rows::delete_row(self.conn, "days", day.id)
    }

    /// Deletes a stage, its days and their sessions.
    pub fn remove_stage(&self, stage: &Stage) -> Result<(), DbError> {
        debug!(stage = %stage.id, "removing stage");
        for shift in plan_stage_delete(stage) {
            self.shift_user(shift)?;
        }
        for day in rows::days_of_stage(self.conn, stage.id)? {
            self.remove_day(&day, ParentUpdate::Skip)?;
        }
        rows::delete_row(self.conn, "stages", stage.id)
    }

    /// Deletes a subject and its sessions.
    pub fn remove_subject(&self, subject: &Subject) -> Result<(), DbError> {
        debug!(subject = %subject.id, "removing subject");
        for shift in plan_subject_delete(subject) {
            self.shift_user(shift)?;
        }
        for session in rows::sessions_of_subject(self.conn, subject.id)? {
            self.remove_session(&session, ParentUpdate::Apply, ParentUpdate::Skip)?;
        }
        rows::delete_row(self.conn, "subjects", subject.id)
    }

    fn apply_session_plan(&self, plan: SessionPlan) -> Result<(), DbError> {
        for shift in plan.days {
            self.shift_day(shift)?;
        }
        for shift in plan.subjects {
            self.shift_subject(shift)?;
        }
        Ok(())
    }

    fn shift_user(&self, shift: Shift<UserId>) -> Result<(), DbError> {
        let mut user = rows::require_user(self.conn, shift.parent)?;
        debug!(user = %shift.parent, delta = ?shift.delta, "shifting user");
        user.absorb(&shift.delta);
        self.save_user(&mut user)
    }

    fn shift_stage(&self, shift: Shift<StageId>) -> Result<(), DbError> {
        let mut stage = rows::require_stage(self.conn, shift.parent)?;
        debug!(stage = %shift.parent, delta = ?shift.delta, "shifting stage");
        stage.absorb(&shift.delta);
        self.save_stage(&mut stage)
    }

    fn shift_day(&self, shift: Shift<DayId>) -> Result<(), DbError> {
        let mut day = rows::require_day(self.conn, shift.parent)?;
        debug!(day = %shift.parent, delta = ?shift.delta, "shifting day");
        day.absorb(&shift.delta);
        self.save_day(&mut day)
    }

    fn shift_subject(&self, shift: Shift<SubjectId>) -> Result<(), DbError> {
        let mut subject = rows::require_subject(self.conn, shift.parent)?;
        debug!(subject = %shift.parent, delta = ?shift.delta, "shifting subject");
        subject.absorb(&shift.delta);
        self.save_subject(&mut subject)
    }

    /// The stored row behind `id`, or `None` for a record not yet inserted.
    fn stored<I, T>(
        &self,
        id: I,
        load: fn(&Connection, I) -> Result<T, DbError>,
    ) -> Result<Option<T>, DbError>
    where
        I: RowId,
    {
        if id.is_unsaved() {
            Ok(None)
        } else {
            load(self.conn, id).map(Some)
        }
    }
}
