//! Create, update and delete operations.
//!
//! Each operation runs in one immediate transaction: the acting user's rows
//! are looked up, validation runs against the stored state, and only then is
//! the cascade invoked. A validation failure returns before anything is
//! written. Records owned by another user are reported as not found.

use st_core::validate::{
    self, DAY_EXISTS, EMAIL_TAKEN, STAGE_EXISTS, SUBJECT_EXISTS, USERNAME_TAKEN,
};
use st_core::{
    Day, DayChanges, DayId, NewDay, NewSession, NewStage, NewSubject, NewUser, ParentUpdate,
    Session, SessionChanges, SessionId, Stage, StageChanges, StageId, Subject, SubjectChanges,
    SubjectId, User, UserChanges, UserId, ValidationErrors,
};
use tracing::{info, warn};

use crate::rows;
use crate::{Database, DbError};

/// Fails with the collected errors, if any.
fn reject(entity: &'static str, errors: ValidationErrors) -> Result<(), DbError> {
    errors.into_result().map_err(|errors| {
        warn!(entity, %errors, "rejected invalid input");
        DbError::from(errors)
    })
}

impl Database {
    /// Registers a user with all counters at zero.
    pub fn create_user(&mut self, new: NewUser) -> Result<User, DbError> {
        let mut user = User::draft(new);
        self.mutate(|cascade| {
            let conn = cascade.conn();
            let mut errors = ValidationErrors::new();
            validate::check_user(&mut errors, &user);
            validate::check_unique(
                &mut errors,
                "username",
                rows::username_taken(conn, &user.username)?,
                USERNAME_TAKEN,
            );
            validate::check_unique(
                &mut errors,
                "email",
                rows::email_taken(conn, &user.email)?,
                EMAIL_TAKEN,
            );
            reject("user", errors)?;
            cascade.save_user(&mut user)
        })?;
        info!(user = %user.id, username = %user.username, "created user");
        Ok(user)
    }

    /// Edits profile fields; totals are left as stored.
    pub fn update_user(&mut self, id: UserId, changes: UserChanges) -> Result<User, DbError> {
        let user = self.mutate(|cascade| {
            let conn = cascade.conn();
            let stored = rows::require_user(conn, id)?;
            let mut user = stored.clone();
            changes.apply(&mut user);

            let mut errors = ValidationErrors::new();
            validate::check_user(&mut errors, &user);
            if user.username != stored.username {
                validate::check_unique(
                    &mut errors,
                    "username",
                    rows::username_taken(conn, &user.username)?,
                    USERNAME_TAKEN,
                );
            }
            if user.email != stored.email {
                validate::check_unique(
                    &mut errors,
                    "email",
                    rows::email_taken(conn, &user.email)?,
                    EMAIL_TAKEN,
                );
            }
            reject("user", errors)?;
            cascade.save_user(&mut user)?;
            Ok(user)
        })?;
        info!(user = %user.id, "updated user");
        Ok(user)
    }

    /// Removes a user and, through foreign keys, everything they own.
    pub fn delete_user(&mut self, id: UserId) -> Result<(), DbError> {
        self.mutate(|cascade| {
            let conn = cascade.conn();
            rows::require_user(conn, id)?;
            rows::delete_row(conn, "users", id)
        })?;
        info!(user = %id, "deleted user");
        Ok(())
    }

    pub fn create_stage(&mut self, user: UserId, new: NewStage) -> Result<Stage, DbError> {
        let mut stage = Stage::draft(user, new);
        self.mutate(|cascade| {
            let conn = cascade.conn();
            rows::require_user(conn, user)?;
            let mut errors = ValidationErrors::new();
            validate::check_name(&mut errors, &stage.name);
            validate::check_text(&mut errors, "description", stage.description.as_deref());
            validate::check_unique(
                &mut errors,
                "name",
                rows::stage_name_taken(conn, user, &stage.name)?,
                STAGE_EXISTS,
            );
            reject("stage", errors)?;
            cascade.save_stage(&mut stage)
        })?;
        info!(user = %user, stage = %stage.id, name = %stage.name, "created stage");
        Ok(stage)
    }

    pub fn update_stage(
        &mut self,
        user: UserId,
        id: StageId,
        changes: StageChanges,
    ) -> Result<Stage, DbError> {
        let stage = self.mutate(|cascade| {
            let conn = cascade.conn();
            let stored = rows::owned_stage(conn, user, id)?;
            let mut stage = stored.clone();
            changes.apply(&mut stage);

            let mut errors = ValidationErrors::new();
            validate::check_name(&mut errors, &stage.name);
            validate::check_text(&mut errors, "description", stage.description.as_deref());
            if stage.name != stored.name {
                validate::check_unique(
                    &mut errors,
                    "name",
                    rows::stage_name_taken(conn, user, &stage.name)?,
                    STAGE_EXISTS,
                );
            }
            reject("stage", errors)?;
            cascade.save_stage(&mut stage)?;
            Ok(stage)
        })?;
        info!(user = %user, stage = %stage.id, "updated stage");
        Ok(stage)
    }

    /// Deletes a stage with its days and sessions.
    pub fn delete_stage(&mut self, user: UserId, id: StageId) -> Result<(), DbError> {
        self.mutate(|cascade| {
            let stage = rows::owned_stage(cascade.conn(), user, id)?;
            cascade.remove_stage(&stage)
        })?;
        info!(user = %user, stage = %id, "deleted stage");
        Ok(())
    }

    pub fn create_subject(&mut self, user: UserId, new: NewSubject) -> Result<Subject, DbError> {
        let mut subject = Subject::draft(user, new);
        self.mutate(|cascade| {
            let conn = cascade.conn();
            rows::require_user(conn, user)?;
            let mut errors = ValidationErrors::new();
            validate::check_name(&mut errors, &subject.name);
            validate::check_text(&mut errors, "description", subject.description.as_deref());
            validate::check_unique(
                &mut errors,
                "name",
                rows::subject_name_taken(conn, user, &subject.name)?,
                SUBJECT_EXISTS,
            );
            reject("subject", errors)?;
            cascade.save_subject(&mut subject)
        })?;
        info!(user = %user, subject = %subject.id, name = %subject.name, "created subject");
        Ok(subject)
    }

    pub fn update_subject(
        &mut self,
        user: UserId,
        id: SubjectId,
        changes: SubjectChanges,
    ) -> Result<Subject, DbError> {
        let subject = self.mutate(|cascade| {
            let conn = cascade.conn();
            let stored = rows::owned_subject(conn, user, id)?;
            let mut subject = stored.clone();
            changes.apply(&mut subject);

            let mut errors = ValidationErrors::new();
            validate::check_name(&mut errors, &subject.name);
            validate::check_text(&mut errors, "description", subject.description.as_deref());
            if subject.name != stored.name {
                validate::check_unique(
                    &mut errors,
                    "name",
                    rows::subject_name_taken(conn, user, &subject.name)?,
                    SUBJECT_EXISTS,
                );
            }
            reject("subject", errors)?;
            cascade.save_subject(&mut subject)?;
            Ok(subject)
        })?;
        info!(user = %user, subject = %subject.id, "updated subject");
        Ok(subject)
    }

    /// Deletes a subject with its sessions.
    pub fn delete_subject(&mut self, user: UserId, id: SubjectId) -> Result<(), DbError> {
        self.mutate(|cascade| {
            let subject = rows::owned_subject(cascade.conn(), user, id)?;
            cascade.remove_subject(&subject)
        })?;
        info!(user = %user, subject = %id, "deleted subject");
        Ok(())
    }

    pub fn create_day(&mut self, user: UserId, new: NewDay) -> Result<Day, DbError> {
        let mut day = Day::draft(user, new);
        self.mutate(|cascade| {
            let conn = cascade.conn();
            rows::require_user(conn, user)?;
            let stage = rows::require_stage(conn, day.stage_id)?;

            let mut errors = ValidationErrors::new();
            validate::check_owner(&mut errors, "stage", stage.user_id, user);
            validate::check_unique(
                &mut errors,
                "day",
                rows::day_taken(conn, user, day.day)?,
                DAY_EXISTS,
            );
            validate::check_day(&mut errors, &day);
            reject("day", errors)?;
            cascade.save_day(&mut day)
        })?;
        info!(user = %user, day = %day.id, date = %day.day, "created day");
        Ok(day)
    }

    /// Edits a day's own fields. Its study time and session count are kept.
    pub fn update_day(
        &mut self,
        user: UserId,
        id: DayId,
        changes: DayChanges,
    ) -> Result<Day, DbError> {
        let day = self.mutate(|cascade| {
            let conn = cascade.conn();
            let stored = rows::owned_day(conn, user, id)?;
            let mut day = stored.clone();
            changes.apply(&mut day);
            day.refresh();
            let stage = rows::require_stage(conn, day.stage_id)?;

            let mut errors = ValidationErrors::new();
            validate::check_owner(&mut errors, "stage", stage.user_id, user);
            if day.day != stored.day {
                validate::check_unique(
                    &mut errors,
                    "day",
                    rows::day_taken(conn, user, day.day)?,
                    DAY_EXISTS,
                );
            }
            validate::check_day(&mut errors, &day);
            reject("day", errors)?;
            cascade.save_day(&mut day)?;
            Ok(day)
        })?;
        info!(user = %user, day = %day.id, "updated day");
        Ok(day)
    }

    /// Deletes a day with its sessions.
    pub fn delete_day(&mut self, user: UserId, id: DayId) -> Result<(), DbError> {
        self.mutate(|cascade| {
            let day = rows::owned_day(cascade.conn(), user, id)?;
            cascade.remove_day(&day, ParentUpdate::Apply)
        })?;
        info!(user = %user, day = %id, "deleted day");
        Ok(())
    }

    pub fn create_session(&mut self, user: UserId, new: NewSession) -> Result<Session, DbError> {
        let mut session = Session::draft(user, new);
        self.mutate(|cascade| {
            let conn = cascade.conn();
            rows::require_user(conn, user)?;
            check_session(conn, user, &session)?;
            cascade.save_session(&mut session)
        })?;
        info!(
            user = %user,
            session = %session.id,
            duration = session.duration,
            "created session"
        );
        Ok(session)
    }

    pub fn update_session(
        &mut self,
        user: UserId,
        id: SessionId,
        changes: SessionChanges,
    ) -> Result<Session, DbError> {
        let session = self.mutate(|cascade| {
            let conn = cascade.conn();
            let mut session = rows::owned_session(conn, user, id)?;
            changes.apply(&mut session);
            session.refresh();
            check_session(conn, user, &session)?;
            cascade.save_session(&mut session)?;
            Ok(session)
        })?;
        info!(
            user = %user,
            session = %session.id,
            duration = session.duration,
            "updated session"
        );
        Ok(session)
    }

    pub fn delete_session(&mut self, user: UserId, id: SessionId) -> Result<(), DbError> {
        self.mutate(|cascade| {
            let session = rows::owned_session(cascade.conn(), user, id)?;
            cascade.remove_session(&session, ParentUpdate::Apply, ParentUpdate::Apply)
        })?;
        info!(user = %user, session = %id, "deleted session");
        Ok(())
    }
}

fn check_session(
    conn: &rusqlite::Connection,
    user: UserId,
    session: &Session,
) -> Result<(), DbError> {
    let day = rows::require_day(conn, session.day_id)?;
    let subject = rows::require_subject(conn, session.subject_id)?;

    let mut errors = ValidationErrors::new();
    validate::check_owner(&mut errors, "day", day.user_id, user);
    validate::check_owner(&mut errors, "subject", subject.user_id, user);
    validate::check_session(&mut errors, session);
    reject("session", errors)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use st_core::{Ratio, RowId};

    use super::*;
    use crate::SessionFilter;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 5, day).unwrap()
    }

    fn user(db: &mut Database, name: &str) -> UserId {
        db.create_user(NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            ..NewUser::default()
        })
        .unwrap()
        .id
    }

    fn stage(db: &mut Database, user: UserId, name: &str) -> StageId {
        db.create_stage(
            user,
            NewStage {
                name: name.to_string(),
                description: None,
            },
        )
        .unwrap()
        .id
    }

    fn subject(db: &mut Database, user: UserId, name: &str) -> SubjectId {
        db.create_subject(
            user,
            NewSubject {
                name: name.to_string(),
                description: None,
            },
        )
        .unwrap()
        .id
    }

    /// A 09:00-21:00 day with one hour of work: 11h usable.
    fn new_day(stage: StageId, day: u32) -> NewDay {
        NewDay {
            stage_id: stage,
            day: date(day),
            worktime: 3600,
            start: hm(9, 0),
            end: Some(hm(21, 0)),
            end_next_day: Some(false),
            comment: None,
        }
    }

    fn new_session(day: DayId, subject: SubjectId, start: NaiveTime, end: NaiveTime) -> NewSession {
        NewSession {
            day_id: day,
            subject_id: subject,
            start,
            end: Some(end),
            end_next_day: Some(false),
        }
    }

    struct Fixture {
        db: Database,
        user: UserId,
        stage: StageId,
        day: DayId,
        subject: SubjectId,
    }

    fn fixture() -> Fixture {
        let mut db = Database::open_in_memory().unwrap();
        let user = user(&mut db, "fx");
        let stage = stage(&mut db, user, "2022Q1");
        let subject = subject(&mut db, user, "CS");
        let day = db.create_day(user, new_day(stage, 6)).unwrap().id;
        Fixture {
            db,
            user,
            stage,
            day,
            subject,
        }
    }

    fn field_errors(err: DbError) -> ValidationErrors {
        match err {
            DbError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn session_create_rolls_up_to_every_ancestor() {
        let mut f = fixture();
        let session = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(11, 11), hm(13, 10)))
            .unwrap();
        assert_eq!(session.duration, 7140);

        let day = f.db.day(f.user, f.day).unwrap();
        assert_eq!(day.study_time, 7140);
        assert_eq!(day.session_count, 1);
        assert_eq!(day.time_usage_ratio, Ratio::of(7140, 11 * 3600));

        let subject = f.db.subject(f.user, f.subject).unwrap();
        assert_eq!(subject.total_study_time, 7140);
        assert_eq!(subject.session_count, 1);

        let stage = f.db.stage(f.user, f.stage).unwrap();
        assert_eq!(stage.total_study_time, 7140);
        assert_eq!(stage.total_usable_time, 11 * 3600);
        assert_eq!(stage.total_work_time, 3600);
        assert_eq!(stage.session_count, 1);
        assert_eq!(stage.day_count, 1);

        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.total_study_time, 7140);
        assert_eq!(user.total_usable_time, 11 * 3600);
        assert_eq!(user.total_work_time, 3600);
        assert_eq!(user.stage_count, 1);
        assert_eq!(user.subject_count, 1);
        assert_eq!(user.day_count, 1);
        assert_eq!(user.session_count, 1);
        assert_eq!(user.time_usage_ratio, Ratio::of(7140, 11 * 3600));
    }

    #[test]
    fn open_session_counts_without_time() {
        let mut f = fixture();
        f.db.create_session(
            f.user,
            NewSession {
                day_id: f.day,
                subject_id: f.subject,
                start: hm(10, 0),
                end: None,
                end_next_day: Some(false),
            },
        )
        .unwrap();

        let day = f.db.day(f.user, f.day).unwrap();
        assert_eq!(day.study_time, 0);
        assert_eq!(day.session_count, 1);
        let subject = f.db.subject(f.user, f.subject).unwrap();
        assert_eq!(subject.session_count, 1);
        assert_eq!(f.db.user(f.user).unwrap().session_count, 1);
    }

    #[test]
    fn identical_session_update_leaves_ancestors_unchanged() {
        let mut f = fixture();
        let session = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        let before = (
            f.db.day(f.user, f.day).unwrap(),
            f.db.subject(f.user, f.subject).unwrap(),
            f.db.stage(f.user, f.stage).unwrap(),
            f.db.user(f.user).unwrap(),
        );

        f.db.update_session(f.user, session.id, SessionChanges::default())
            .unwrap();

        let after = (
            f.db.day(f.user, f.day).unwrap(),
            f.db.subject(f.user, f.subject).unwrap(),
            f.db.stage(f.user, f.stage).unwrap(),
            f.db.user(f.user).unwrap(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn moving_a_session_moves_exactly_its_contribution() {
        let mut f = fixture();
        let other_day = f.db.create_day(f.user, new_day(f.stage, 7)).unwrap().id;
        let other_subject = subject(&mut f.db, f.user, "Math");
        let session = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 30)))
            .unwrap();
        let user_before = f.db.user(f.user).unwrap();

        f.db.update_session(
            f.user,
            session.id,
            SessionChanges {
                day_id: Some(other_day),
                subject_id: Some(other_subject),
                ..SessionChanges::default()
            },
        )
        .unwrap();

        let old_day = f.db.day(f.user, f.day).unwrap();
        let new_day = f.db.day(f.user, other_day).unwrap();
        assert_eq!((old_day.study_time, old_day.session_count), (0, 0));
        assert_eq!((new_day.study_time, new_day.session_count), (5400, 1));

        let old_subject = f.db.subject(f.user, f.subject).unwrap();
        let new_subject = f.db.subject(f.user, other_subject).unwrap();
        assert_eq!((old_subject.total_study_time, old_subject.session_count), (0, 0));
        assert_eq!((new_subject.total_study_time, new_subject.session_count), (5400, 1));

        // Both days belong to the same stage, so the user is unchanged.
        assert_eq!(f.db.user(f.user).unwrap(), user_before);
    }

    #[test]
    fn session_duration_change_applies_the_difference() {
        let mut f = fixture();
        let session = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        f.db.update_session(
            f.user,
            session.id,
            SessionChanges {
                end: Some(Some(hm(12, 30))),
                ..SessionChanges::default()
            },
        )
        .unwrap();

        assert_eq!(f.db.day(f.user, f.day).unwrap().study_time, 9000);
        assert_eq!(f.db.day(f.user, f.day).unwrap().session_count, 1);
        assert_eq!(f.db.user(f.user).unwrap().total_study_time, 9000);
    }

    #[test]
    fn deleting_a_session_reverses_its_creation() {
        let mut f = fixture();
        let before = f.db.user(f.user).unwrap();
        let session = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        f.db.delete_session(f.user, session.id).unwrap();

        assert_eq!(f.db.user(f.user).unwrap(), before);
        assert_eq!(f.db.subject(f.user, f.subject).unwrap().session_count, 0);
        assert!(matches!(
            f.db.session(f.user, session.id),
            Err(DbError::NotFound { entity: "session", .. })
        ));
    }

    #[test]
    fn stage_create_then_delete_restores_user_aggregates() {
        let mut f = fixture();
        let before = f.db.user(f.user).unwrap();

        let stage = stage(&mut f.db, f.user, "2022Q2");
        let day = f.db.create_day(f.user, new_day(stage, 20)).unwrap().id;
        f.db.create_session(f.user, new_session(day, f.subject, hm(9, 30), hm(12, 0)))
            .unwrap();
        assert_eq!(f.db.user(f.user).unwrap().stage_count, 2);

        f.db.delete_stage(f.user, stage).unwrap();

        assert_eq!(f.db.user(f.user).unwrap(), before);
        let subject = f.db.subject(f.user, f.subject).unwrap();
        assert_eq!((subject.total_study_time, subject.session_count), (0, 0));
        assert!(f.db.days(f.user, Some(stage)).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_day_removes_its_sessions_from_the_subject() {
        let mut f = fixture();
        f.db.create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        f.db.delete_day(f.user, f.day).unwrap();

        let stage = f.db.stage(f.user, f.stage).unwrap();
        assert_eq!(stage.day_count, 0);
        assert_eq!(stage.session_count, 0);
        assert_eq!(stage.total_usable_time, 0);
        assert_eq!(stage.time_usage_ratio, Ratio::ZERO);

        let subject = f.db.subject(f.user, f.subject).unwrap();
        assert_eq!(subject.session_count, 0);

        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.day_count, 0);
        assert_eq!(user.session_count, 0);
        assert_eq!(user.time_usage_ratio, Ratio::ZERO);
    }

    #[test]
    fn deleting_a_subject_persists_the_user_count() {
        let mut f = fixture();
        let empty = subject(&mut f.db, f.user, "Unused");
        assert_eq!(f.db.user(f.user).unwrap().subject_count, 2);

        f.db.delete_subject(f.user, empty).unwrap();
        assert_eq!(f.db.user(f.user).unwrap().subject_count, 1);

        f.db.create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        f.db.delete_subject(f.user, f.subject).unwrap();

        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.subject_count, 0);
        assert_eq!(user.session_count, 0);
        assert_eq!(user.total_study_time, 0);
        assert_eq!(f.db.day(f.user, f.day).unwrap().session_count, 0);
    }

    #[test]
    fn moving_a_day_between_stages() {
        let mut f = fixture();
        let other = stage(&mut f.db, f.user, "2022Q2");
        f.db.create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();

        f.db.update_day(
            f.user,
            f.day,
            DayChanges {
                stage_id: Some(other),
                worktime: Some(0),
                ..DayChanges::default()
            },
        )
        .unwrap();

        let old = f.db.stage(f.user, f.stage).unwrap();
        assert_eq!(
            (old.day_count, old.session_count, old.total_usable_time, old.total_study_time),
            (0, 0, 0, 0)
        );
        let new = f.db.stage(f.user, other).unwrap();
        assert_eq!(new.day_count, 1);
        assert_eq!(new.session_count, 1);
        assert_eq!(new.total_usable_time, 12 * 3600);
        assert_eq!(new.total_study_time, 3600);
        assert_eq!(new.total_work_time, 0);

        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.total_usable_time, 12 * 3600);
        assert_eq!(user.day_count, 1);
    }

    #[test]
    fn editing_day_fields_keeps_its_study_time() {
        let mut f = fixture();
        f.db.create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        let day = f
            .db
            .update_day(
                f.user,
                f.day,
                DayChanges {
                    end: Some(None),
                    ..DayChanges::default()
                },
            )
            .unwrap();
        assert_eq!(day.usable_time, 0);
        assert_eq!(day.study_time, 3600);
        assert_eq!(day.time_usage_ratio, Ratio::ZERO);
        assert_eq!(f.db.stage(f.user, f.stage).unwrap().total_usable_time, 0);
    }

    #[test]
    fn day_ratio_above_one_is_a_conflict() {
        let mut f = fixture();
        let short = f
            .db
            .create_day(
                f.user,
                NewDay {
                    end: Some(hm(11, 0)),
                    ..new_day(f.stage, 8)
                },
            )
            .unwrap();
        assert_eq!(short.usable_time, 3600);

        let err = f
            .db
            .create_session(f.user, new_session(short.id, f.subject, hm(9, 0), hm(11, 0)))
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "{err:?}");

        // Nothing from the rejected session was kept.
        assert_eq!(f.db.day(f.user, short.id).unwrap().session_count, 0);
        assert_eq!(f.db.subject(f.user, f.subject).unwrap().session_count, 0);
        assert!(f.db.sessions(f.user, SessionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn open_day_sessions_cannot_push_user_ratio_above_one() {
        let mut f = fixture();
        let open = f
            .db
            .create_day(
                f.user,
                NewDay {
                    end: None,
                    end_next_day: None,
                    ..new_day(f.stage, 7)
                },
            )
            .unwrap();
        assert_eq!(open.usable_time, 0);

        // 12h of study against the 11h usable on the only complete day.
        let err = f
            .db
            .create_session(f.user, new_session(open.id, f.subject, hm(9, 0), hm(21, 0)))
            .unwrap_err();
        match &err {
            DbError::Conflict(message) => {
                assert!(message.contains("user_time_usage_ratio_range"), "{message}");
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.total_study_time, 0);
        assert_eq!(user.session_count, 0);
        assert_eq!(f.db.day(f.user, open.id).unwrap().study_time, 0);

        // Within the user's usable time the open day accepts sessions.
        f.db.create_session(f.user, new_session(open.id, f.subject, hm(9, 0), hm(19, 0)))
            .unwrap();
        let user = f.db.user(f.user).unwrap();
        assert_eq!(user.time_usage_ratio, Ratio::of(10, 11));
    }

    #[test]
    fn duplicate_names_and_dates_are_rejected() {
        let mut f = fixture();
        let err = f
            .db
            .create_stage(
                f.user,
                NewStage {
                    name: "2022Q1".to_string(),
                    description: None,
                },
            )
            .unwrap_err();
        assert!(field_errors(err).has_field("name"));

        let err = f
            .db
            .create_subject(
                f.user,
                NewSubject {
                    name: "CS".to_string(),
                    description: None,
                },
            )
            .unwrap_err();
        assert!(field_errors(err).has_field("name"));

        let err = f.db.create_day(f.user, new_day(f.stage, 6)).unwrap_err();
        assert!(field_errors(err).has_field("day"));

        // Another user may reuse the same names and dates.
        let other = user(&mut f.db, "other");
        let other_stage = stage(&mut f.db, other, "2022Q1");
        assert!(f.db.create_day(other, new_day(other_stage, 6)).is_ok());
    }

    #[test]
    fn unchanged_name_is_not_checked_for_uniqueness() {
        let mut f = fixture();
        let updated = f
            .db
            .update_stage(
                f.user,
                f.stage,
                StageChanges {
                    name: Some("2022Q1".to_string()),
                    description: Some(Some("1st quarter".to_string())),
                },
            )
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("1st quarter"));

        let other = stage(&mut f.db, f.user, "2022Q2");
        let err = f
            .db
            .update_stage(
                f.user,
                other,
                StageChanges {
                    name: Some("2022Q1".to_string()),
                    description: None,
                },
            )
            .unwrap_err();
        assert!(field_errors(err).has_field("name"));
    }

    #[test]
    fn day_and_session_rules_reject_before_writing() {
        let mut f = fixture();
        let err = f
            .db
            .create_day(
                f.user,
                NewDay {
                    worktime: 13 * 3600,
                    ..new_day(f.stage, 9)
                },
            )
            .unwrap_err();
        assert!(field_errors(err).has_field("end"));
        assert_eq!(f.db.user(f.user).unwrap().day_count, 1);

        let err = f
            .db
            .create_session(f.user, new_session(f.day, f.subject, hm(11, 0), hm(11, 0)))
            .unwrap_err();
        assert!(field_errors(err).has_field("end"));
        assert_eq!(f.db.user(f.user).unwrap().session_count, 0);
    }

    #[test]
    fn foreign_rows_are_rejected_or_hidden() {
        let mut f = fixture();
        let other = user(&mut f.db, "other");
        let other_stage = stage(&mut f.db, other, "Theirs");

        let err = f.db.create_day(f.user, new_day(other_stage, 10)).unwrap_err();
        assert!(field_errors(err).has_field("stage"));

        let other_subject = subject(&mut f.db, other, "Theirs");
        let err = f
            .db
            .create_session(f.user, new_session(f.day, other_subject, hm(10, 0), hm(11, 0)))
            .unwrap_err();
        let errors = field_errors(err);
        assert!(errors.has_field("subject"));
        assert!(!errors.has_field("day"));

        assert!(matches!(
            f.db.delete_stage(other, f.stage),
            Err(DbError::NotFound { entity: "stage", .. })
        ));
        assert_eq!(f.db.user(f.user).unwrap().stage_count, 1);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let mut f = fixture();
        let err = f
            .db
            .create_session(
                f.user,
                new_session(DayId::new(999), f.subject, hm(10, 0), hm(11, 0)),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "day", id: 999 }));
    }

    #[test]
    fn user_registration_and_profile() {
        let mut db = Database::open_in_memory().unwrap();
        let id = user(&mut db, "fx");

        let err = db
            .create_user(NewUser {
                username: "fx".to_string(),
                email: "fx@example.com".to_string(),
                ..NewUser::default()
            })
            .unwrap_err();
        let errors = field_errors(err);
        assert!(errors.has_field("username"));
        assert!(errors.has_field("email"));

        let user = db
            .update_user(
                id,
                UserChanges {
                    first_name: Some("Feng".to_string()),
                    email: Some("feng@example.com".to_string()),
                    ..UserChanges::default()
                },
            )
            .unwrap();
        assert_eq!(user.first_name, "Feng");
        assert_eq!(db.user_by_username("fx").unwrap().unwrap().email, "feng@example.com");
    }

    #[test]
    fn deleting_a_user_removes_everything_they_own() {
        let mut f = fixture();
        f.db.create_session(f.user, new_session(f.day, f.subject, hm(10, 0), hm(11, 0)))
            .unwrap();
        let other = user(&mut f.db, "other");
        stage(&mut f.db, other, "Kept");

        f.db.delete_user(f.user).unwrap();

        for table in ["stages", "subjects", "days", "sessions"] {
            let owned: i64 = f
                .db
                .conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?"),
                    [f.user.raw()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(owned, 0, "{table}");
        }
        assert_eq!(f.db.stages(other).unwrap().len(), 1);
        assert!(matches!(
            f.db.user(f.user),
            Err(DbError::NotFound { entity: "user", .. })
        ));
    }
}
