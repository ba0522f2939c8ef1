//! Read accessors and listings, always scoped to the acting user.

use rusqlite::{OptionalExtension, params};
use st_core::{
    ClockSpan, Dashboard, Day, DayId, DayMaxima, Histogram, Resolution, Session, SessionId, Stage,
    StageId, Subject, SubjectId, User, UserId,
};

use crate::rows::{
    self, DAY_COLUMNS, SESSION_COLUMNS, STAGE_COLUMNS, SUBJECT_COLUMNS, USER_COLUMNS,
};
use crate::{Database, DbError};

/// Narrows a session listing to one Day and/or one Subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub day: Option<DayId>,
    pub subject: Option<SubjectId>,
}

impl Database {
    pub fn user(&self, id: UserId) -> Result<User, DbError> {
        rows::require_user(&self.conn, id)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        Ok(self
            .conn
            .query_row(&sql, [username], rows::user_from_row)
            .optional()?)
    }

    pub fn stage(&self, user: UserId, id: StageId) -> Result<Stage, DbError> {
        rows::owned_stage(&self.conn, user, id)
    }

    /// Lists a user's stages, newest first.
    pub fn stages(&self, user: UserId) -> Result<Vec<Stage>, DbError> {
        let sql = format!("SELECT {STAGE_COLUMNS} FROM stages WHERE user_id = ? ORDER BY id DESC");
        rows::query_all(&self.conn, &sql, [user], rows::stage_from_row)
    }

    pub fn subject(&self, user: UserId, id: SubjectId) -> Result<Subject, DbError> {
        rows::owned_subject(&self.conn, user, id)
    }

    /// Lists a user's subjects, newest first.
    pub fn subjects(&self, user: UserId) -> Result<Vec<Subject>, DbError> {
        let sql =
            format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ? ORDER BY id DESC");
        rows::query_all(&self.conn, &sql, [user], rows::subject_from_row)
    }

    pub fn day(&self, user: UserId, id: DayId) -> Result<Day, DbError> {
        rows::owned_day(&self.conn, user, id)
    }

    /// Lists a user's days, newest first, optionally only those of one stage.
    pub fn days(&self, user: UserId, stage: Option<StageId>) -> Result<Vec<Day>, DbError> {
        let sql = format!(
            "
            SELECT {DAY_COLUMNS}
            FROM days
            WHERE user_id = ?1 AND (?2 IS NULL OR stage_id = ?2)
            ORDER BY id DESC
            "
        );
        rows::query_all(&self.conn, &sql, params![user, stage], rows::day_from_row)
    }

    pub fn session(&self, user: UserId, id: SessionId) -> Result<Session, DbError> {
        rows::owned_session(&self.conn, user, id)
    }

    /// Lists a user's sessions, newest first.
    pub fn sessions(&self, user: UserId, filter: SessionFilter) -> Result<Vec<Session>, DbError> {
        let sql = format!(
            "
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = ?1
              AND (?2 IS NULL OR day_id = ?2)
              AND (?3 IS NULL OR subject_id = ?3)
            ORDER BY id DESC
            "
        );
        rows::query_all(
            &self.conn,
            &sql,
            params![user, filter.day, filter.subject],
            rows::session_from_row,
        )
    }

    /// Every session interval of a user, complete or not.
    pub fn session_spans(&self, user: UserId) -> Result<Vec<ClockSpan>, DbError> {
        rows::query_all(
            &self.conn,
            "SELECT start_time, end_time, end_next_day FROM sessions WHERE user_id = ? ORDER BY id",
            [user],
            |row| Ok(ClockSpan::new(row.get(0)?, row.get(1)?, row.get(2)?)),
        )
    }

    /// Maxima over a user's days, or over one stage's days. Zero when empty.
    pub fn day_maxima(&self, user: UserId, stage: Option<StageId>) -> Result<DayMaxima, DbError> {
        Ok(self.conn.query_row(
            "
            SELECT
                COALESCE(MAX(usable_time), 0),
                COALESCE(MAX(study_time), 0),
                COALESCE(MAX(time_usage_ratio), 0)
            FROM days
            WHERE user_id = ?1 AND (?2 IS NULL OR stage_id = ?2)
            ",
            params![user, stage],
            |row| {
                Ok(DayMaxima {
                    max_usable_time: row.get(0)?,
                    max_study_time: row.get(1)?,
                    max_time_usage_ratio: row.get(2)?,
                })
            },
        )?)
    }

    /// Collects everything the dashboard shows for one user.
    pub fn dashboard(&self, user: UserId, resolution: Resolution) -> Result<Dashboard, DbError> {
        let owner = self.user(user)?;
        let maxima = self.day_maxima(user, None)?;
        let histogram = Histogram::build(self.session_spans(user)?, resolution);
        Ok(Dashboard::new(&owner, maxima, histogram))
    }
}
