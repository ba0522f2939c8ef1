//! Row mapping and single-row reads/writes.
//!
//! Everything here takes a plain `&Connection` so it can run either on the
//! database connection directly or on an open transaction (which derefs to
//! one).

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};

use st_core::{
    Day, DayId, RowId, Session, SessionId, Stage, StageId, Subject, SubjectId, User, UserId,
};

use crate::DbError;

pub const USER_COLUMNS: &str = "id, username, email, first_name, last_name, \
     total_usable_time, total_study_time, total_work_time, \
     stage_count, day_count, session_count, subject_count, time_usage_ratio";

pub const STAGE_COLUMNS: &str = "id, user_id, name, description, day_count, session_count, \
     total_usable_time, total_study_time, total_work_time, time_usage_ratio";

pub const DAY_COLUMNS: &str = "id, user_id, stage_id, day, day_of_week, session_count, worktime, \
     start_time, end_time, end_next_day, usable_time, study_time, time_usage_ratio, comment";

pub const SESSION_COLUMNS: &str =
    "id, user_id, day_id, subject_id, start_time, end_time, end_next_day, duration";

pub const SUBJECT_COLUMNS: &str =
    "id, user_id, name, description, total_study_time, session_count";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        total_usable_time: row.get(5)?,
        total_study_time: row.get(6)?,
        total_work_time: row.get(7)?,
        stage_count: row.get(8)?,
        day_count: row.get(9)?,
        session_count: row.get(10)?,
        subject_count: row.get(11)?,
        time_usage_ratio: row.get(12)?,
    })
}

pub fn stage_from_row(row: &Row<'_>) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        day_count: row.get(4)?,
        session_count: row.get(5)?,
        total_usable_time: row.get(6)?,
        total_study_time: row.get(7)?,
        total_work_time: row.get(8)?,
        time_usage_ratio: row.get(9)?,
    })
}

pub fn day_from_row(row: &Row<'_>) -> rusqlite::Result<Day> {
    Ok(Day {
        id: row.get(0)?,
        user_id: row.get(1)?,
        stage_id: row.get(2)?,
        day: row.get(3)?,
        day_of_week: row.get(4)?,
        session_count: row.get(5)?,
        worktime: row.get(6)?,
        start: row.get(7)?,
        end: row.get(8)?,
        end_next_day: row.get(9)?,
        usable_time: row.get(10)?,
        study_time: row.get(11)?,
        time_usage_ratio: row.get(12)?,
        comment: row.get(13)?,
    })
}

pub fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        day_id: row.get(2)?,
        subject_id: row.get(3)?,
        start: row.get(4)?,
        end: row.get(5)?,
        end_next_day: row.get(6)?,
        duration: row.get(7)?,
    })
}

pub fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        total_study_time: row.get(4)?,
        session_count: row.get(5)?,
    })
}

/// Runs a query and collects every mapped row.
pub fn query_all<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, DbError>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn find_by_id<I, T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    id: I,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>, DbError>
where
    I: RowId,
{
    let sql = format!("SELECT {columns} FROM {table} WHERE id = ?");
    Ok(conn.query_row(&sql, [id], map).optional()?)
}

/// Loads a row, failing with [`DbError::NotFound`] when it is missing.
fn require<I, T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    id: I,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<T, DbError>
where
    I: RowId,
{
    find_by_id(conn, table, columns, id, map)?.ok_or_else(|| DbError::not_found(id))
}

pub fn require_user(conn: &Connection, id: UserId) -> Result<User, DbError> {
    require(conn, "users", USER_COLUMNS, id, user_from_row)
}

pub fn require_stage(conn: &Connection, id: StageId) -> Result<Stage, DbError> {
    require(conn, "stages", STAGE_COLUMNS, id, stage_from_row)
}

pub fn require_day(conn: &Connection, id: DayId) -> Result<Day, DbError> {
    require(conn, "days", DAY_COLUMNS, id, day_from_row)
}

pub fn require_session(conn: &Connection, id: SessionId) -> Result<Session, DbError> {
    require(conn, "sessions", SESSION_COLUMNS, id, session_from_row)
}

pub fn require_subject(conn: &Connection, id: SubjectId) -> Result<Subject, DbError> {
    require(conn, "subjects", SUBJECT_COLUMNS, id, subject_from_row)
}

fn visible<I: RowId, T>(row: T, owner: UserId, user: UserId, id: I) -> Result<T, DbError> {
    if owner == user {
        Ok(row)
    } else {
        Err(DbError::not_found(id))
    }
}

/// Loads a stage owned by `user`; anyone else's stage is reported missing.
pub fn owned_stage(conn: &Connection, user: UserId, id: StageId) -> Result<Stage, DbError> {
    let stage = require_stage(conn, id)?;
    let owner = stage.user_id;
    visible(stage, owner, user, id)
}

pub fn owned_day(conn: &Connection, user: UserId, id: DayId) -> Result<Day, DbError> {
    let day = require_day(conn, id)?;
    let owner = day.user_id;
    visible(day, owner, user, id)
}

pub fn owned_session(conn: &Connection, user: UserId, id: SessionId) -> Result<Session, DbError> {
    let session = require_session(conn, id)?;
    let owner = session.user_id;
    visible(session, owner, user, id)
}

pub fn owned_subject(conn: &Connection, user: UserId, id: SubjectId) -> Result<Subject, DbError> {
    let subject = require_subject(conn, id)?;
    let owner = subject.user_id;
    visible(subject, owner, user, id)
}

pub fn sessions_of_day(conn: &Connection, day: DayId) -> Result<Vec<Session>, DbError> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE day_id = ? ORDER BY id ASC");
    query_all(conn, &sql, [day], session_from_row)
}

pub fn sessions_of_subject(conn: &Connection, subject: SubjectId) -> Result<Vec<Session>, DbError> {
    let sql =
        format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE subject_id = ? ORDER BY id ASC");
    query_all(conn, &sql, [subject], session_from_row)
}

pub fn days_of_stage(conn: &Connection, stage: StageId) -> Result<Vec<Day>, DbError> {
    let sql = format!("SELECT {DAY_COLUMNS} FROM days WHERE stage_id = ? ORDER BY id ASC");
    query_all(conn, &sql, [stage], day_from_row)
}

fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<bool, DbError> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

pub fn username_taken(conn: &Connection, username: &str) -> Result<bool, DbError> {
    exists(
        conn,
        "SELECT EXISTS (SELECT 1 FROM users WHERE username = ?)",
        [username],
    )
}

pub fn email_taken(conn: &Connection, email: &str) -> Result<bool, DbError> {
    exists(
        conn,
        "SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)",
        [email],
    )
}

pub fn stage_name_taken(conn: &Connection, user: UserId, name: &str) -> Result<bool, DbError> {
    exists(
        conn,
        "SELECT EXISTS (SELECT 1 FROM stages WHERE user_id = ? AND name = ?)",
        params![user, name],
    )
}

pub fn subject_name_taken(conn: &Connection, user: UserId, name: &str) -> Result<bool, DbError> {
    exists(
        conn,
        "SELECT EXISTS (SELECT 1 FROM subjects WHERE user_id = ? AND name = ?)",
        params![user, name],
    )
}

pub fn day_taken(conn: &Connection, user: UserId, day: NaiveDate) -> Result<bool, DbError> {
    exists(
        conn,
        "SELECT EXISTS (SELECT 1 FROM days WHERE user_id = ? AND day = ?)",
        params![user, day],
    )
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<UserId, DbError> {
    conn.execute(
        "
        INSERT INTO users (
            username, email, first_name, last_name,
            total_usable_time, total_study_time, total_work_time,
            stage_count, day_count, session_count, subject_count, time_usage_ratio
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            user.total_usable_time,
            user.total_study_time,
            user.total_work_time,
            user.stage_count,
            user.day_count,
            user.session_count,
            user.subject_count,
            user.time_usage_ratio,
        ],
    )?;
    Ok(UserId::new(conn.last_insert_rowid()))
}

pub fn update_user(conn: &Connection, user: &User) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?,
            total_usable_time = ?, total_study_time = ?, total_work_time = ?,
            stage_count = ?, day_count = ?, session_count = ?, subject_count = ?,
            time_usage_ratio = ?
        WHERE id = ?
        ",
        params![
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            user.total_usable_time,
            user.total_study_time,
            user.total_work_time,
            user.stage_count,
            user.day_count,
            user.session_count,
            user.subject_count,
            user.time_usage_ratio,
            user.id,
        ],
    )?;
    Ok(())
}

pub fn insert_stage(conn: &Connection, stage: &Stage) -> Result<StageId, DbError> {
    conn.execute(
        "
        INSERT INTO stages (
            user_id, name, description, day_count, session_count,
            total_usable_time, total_study_time, total_work_time, time_usage_ratio
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            stage.user_id,
            stage.name,
            stage.description,
            stage.day_count,
            stage.session_count,
            stage.total_usable_time,
            stage.total_study_time,
            stage.total_work_time,
            stage.time_usage_ratio,
        ],
    )?;
    Ok(StageId::new(conn.last_insert_rowid()))
}

pub fn update_stage(conn: &Connection, stage: &Stage) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE stages
        SET name = ?, description = ?, day_count = ?, session_count = ?,
            total_usable_time = ?, total_study_time = ?, total_work_time = ?,
            time_usage_ratio = ?
        WHERE id = ?
        ",
        params![
            stage.name,
            stage.description,
            stage.day_count,
            stage.session_count,
            stage.total_usable_time,
            stage.total_study_time,
            stage.total_work_time,
            stage.time_usage_ratio,
            stage.id,
        ],
    )?;
    Ok(())
}

pub fn insert_day(conn: &Connection, day: &Day) -> Result<DayId, DbError> {
    conn.execute(
        "
        INSERT INTO days (
            user_id, stage_id, day, day_of_week, session_count, worktime,
            start_time, end_time, end_next_day, usable_time, study_time,
            time_usage_ratio, comment
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            day.user_id,
            day.stage_id,
            day.day,
            day.day_of_week,
            day.session_count,
            day.worktime,
            day.start,
            day.end,
            day.end_next_day,
            day.usable_time,
            day.study_time,
            day.time_usage_ratio,
            day.comment,
        ],
    )?;
    Ok(DayId::new(conn.last_insert_rowid()))
}

pub fn update_day(conn: &Connection, day: &Day) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE days
        SET stage_id = ?, day = ?, day_of_week = ?, session_count = ?, worktime = ?,
            start_time = ?, end_time = ?, end_next_day = ?, usable_time = ?,
            study_time = ?, time_usage_ratio = ?, comment = ?
        WHERE id = ?
        ",
        params![
            day.stage_id,
            day.day,
            day.day_of_week,
            day.session_count,
            day.worktime,
            day.start,
            day.end,
            day.end_next_day,
            day.usable_time,
            day.study_time,
            day.time_usage_ratio,
            day.comment,
            day.id,
        ],
    )?;
    Ok(())
}

pub fn insert_session(conn: &Connection, session: &Session) -> Result<SessionId, DbError> {
    conn.execute(
        "
        INSERT INTO sessions (user_id, day_id, subject_id, start_time, end_time, end_next_day, duration)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            session.user_id,
            session.day_id,
            session.subject_id,
            session.start,
            session.end,
            session.end_next_day,
            session.duration,
        ],
    )?;
    Ok(SessionId::new(conn.last_insert_rowid()))
}

pub fn update_session(conn: &Connection, session: &Session) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE sessions
        SET day_id = ?, subject_id = ?, start_time = ?, end_time = ?, end_next_day = ?, duration = ?
        WHERE id = ?
        ",
        params![
            session.day_id,
            session.subject_id,
            session.start,
            session.end,
            session.end_next_day,
            session.duration,
            session.id,
        ],
    )?;
    Ok(())
}

pub fn insert_subject(conn: &Connection, subject: &Subject) -> Result<SubjectId, DbError> {
    conn.execute(
        "
        INSERT INTO subjects (user_id, name, description, total_study_time, session_count)
        VALUES (?, ?, ?, ?, ?)
        ",
        params![
            subject.user_id,
            subject.name,
            subject.description,
            subject.total_study_time,
            subject.session_count,
        ],
    )?;
    Ok(SubjectId::new(conn.last_insert_rowid()))
}

pub fn update_subject(conn: &Connection, subject: &Subject) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE subjects
        SET name = ?, description = ?, total_study_time = ?, session_count = ?
        WHERE id = ?
        ",
        params![
            subject.name,
            subject.description,
            subject.total_study_time,
            subject.session_count,
            subject.id,
        ],
    )?;
    Ok(())
}

/// Deletes one row by ID.
pub fn delete_row<I: RowId>(conn: &Connection, table: &str, id: I) -> Result<(), DbError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    conn.execute(&sql, [id])?;
    Ok(())
}
