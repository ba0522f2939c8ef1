//! Storage layer for the study tracker.
//!
//! Persists Users, Stages, Days, Sessions and Subjects using `rusqlite`, and
//! keeps their cached rollups consistent by running the aggregate cascade
//! inside the same transaction as each mutation.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Separate processes (or
//! separate `Database` instances) on the same file are serialized by SQLite:
//! every mutation opens its transaction with `BEGIN IMMEDIATE`, so the write
//! lock is held from the first "read previous value" of a cascade until commit.
//!
//! # Schema
//!
//! ## Value formats
//!
//! - Dates are stored as TEXT `YYYY-MM-DD`, clock times as TEXT `HH:MM:SS`.
//! - Durations and totals are INTEGER seconds.
//! - Ratios are INTEGER ten-thousandths (`3333` is `0.3333`).
//! - `end_next_day` is a nullable INTEGER: NULL means "not set yet".
//!
//! ## Constraints
//!
//! Uniqueness of (user, stage name), (user, subject name), (user, date),
//! username and email is enforced by UNIQUE constraints. Every count and time
//! column carries `CHECK (... >= 0)`, and the Day and User ratios must stay in
//! \[0, 1\]. A write that breaks any of these surfaces as
//! [`DbError::Conflict`] and aborts the whole mutation.
//!
//! Foreign keys use `ON DELETE CASCADE`. The per-row cascade (which adjusts
//! rollups) removes children explicitly before their parent, so the foreign
//! key cascade only does work when a whole User is deleted.

mod cascade;
mod ops;
mod queries;
mod rows;

use std::path::Path;

use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use st_core::{RowId, ValidationErrors};
use thiserror::Error;

use crate::cascade::Cascade;

pub use queries::SessionFilter;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
    /// A UNIQUE, CHECK or foreign key constraint rejected a write.
    #[error("constraint violated: {0}")]
    Conflict(String),
    /// A referenced row does not exist (or is not visible to the acting user).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// Field-level validation failed before anything was written.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),
}

impl DbError {
    pub fn not_found<I: RowId>(id: I) -> Self {
        Self::NotFound {
            entity: I::ENTITY,
            id: id.raw(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(message.clone().unwrap_or_else(|| failure.to_string()))
            }
            _ => Self::Sqlite(err),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                total_usable_time INTEGER NOT NULL DEFAULT 0 CHECK (total_usable_time >= 0),
                total_study_time INTEGER NOT NULL DEFAULT 0 CHECK (total_study_time >= 0),
                total_work_time INTEGER NOT NULL DEFAULT 0 CHECK (total_work_time >= 0),
                stage_count INTEGER NOT NULL DEFAULT 0 CHECK (stage_count >= 0),
                day_count INTEGER NOT NULL DEFAULT 0 CHECK (day_count >= 0),
                session_count INTEGER NOT NULL DEFAULT 0 CHECK (session_count >= 0),
                subject_count INTEGER NOT NULL DEFAULT 0 CHECK (subject_count >= 0),
                time_usage_ratio INTEGER NOT NULL DEFAULT 0,
                CONSTRAINT user_time_usage_ratio_range
                    CHECK (time_usage_ratio BETWEEN 0 AND 10000)
            );

            CREATE TABLE IF NOT EXISTS stages (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                day_count INTEGER NOT NULL DEFAULT 0 CHECK (day_count >= 0),
                session_count INTEGER NOT NULL DEFAULT 0 CHECK (session_count >= 0),
                total_usable_time INTEGER NOT NULL DEFAULT 0 CHECK (total_usable_time >= 0),
                total_study_time INTEGER NOT NULL DEFAULT 0 CHECK (total_study_time >= 0),
                total_work_time INTEGER NOT NULL DEFAULT 0 CHECK (total_work_time >= 0),
                time_usage_ratio INTEGER NOT NULL DEFAULT 0,
                CONSTRAINT user_stage_uniqueness UNIQUE (user_id, name),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_stages_user ON stages(user_id);

            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                total_study_time INTEGER NOT NULL DEFAULT 0 CHECK (total_study_time >= 0),
                session_count INTEGER NOT NULL DEFAULT 0 CHECK (session_count >= 0),
                CONSTRAINT user_subject_uniqueness UNIQUE (user_id, name),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_subjects_user ON subjects(user_id);

            -- day: 'YYYY-MM-DD'; start_time/end_time: 'HH:MM:SS'
            -- end_next_day: NULL until the user says whether the day ended after midnight
            CREATE TABLE IF NOT EXISTS days (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                stage_id INTEGER NOT NULL,
                day TEXT NOT NULL,
                day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 1 AND 7),
                session_count INTEGER NOT NULL DEFAULT 0 CHECK (session_count >= 0),
                worktime INTEGER NOT NULL DEFAULT 0 CHECK (worktime >= 0),
                start_time TEXT NOT NULL,
                end_time TEXT,
                end_next_day INTEGER,
                usable_time INTEGER NOT NULL DEFAULT 0 CHECK (usable_time >= 0),
                study_time INTEGER NOT NULL DEFAULT 0 CHECK (study_time >= 0),
                time_usage_ratio INTEGER NOT NULL DEFAULT 0,
                comment TEXT,
                CONSTRAINT user_day_uniqueness UNIQUE (user_id, day),
                CONSTRAINT day_time_usage_ratio_range
                    CHECK (time_usage_ratio BETWEEN 0 AND 10000),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (stage_id) REFERENCES stages(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_days_user ON days(user_id);
            CREATE INDEX IF NOT EXISTS idx_days_stage ON days(stage_id);

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                day_id INTEGER NOT NULL,
                subject_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                end_next_day INTEGER,
                duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (day_id) REFERENCES days(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_day ON sessions(day_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_subject ON sessions(subject_id);
            ",
        )?;
        Ok(())
    }

    /// Runs `op` inside an immediate transaction, committing only on success.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so no other writer can
    /// change a parent row between the cascade reading it and writing it back.
    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&Cascade<'_>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&Cascade::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }
}
