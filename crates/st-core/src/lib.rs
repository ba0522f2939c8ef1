//! Core domain logic for the study tracker.
//!
//! This crate contains the storage-independent parts:
//! - Model: Users, Stages, Days, Sessions and Subjects with their rollups
//! - Cascade: planning the parent adjustments caused by each mutation
//! - Validation: field-level rules checked before anything is written
//! - Histogram: circular time-of-day distribution of sessions
//! - Report: dashboard and detail-view summaries

pub mod cascade;
mod duration;
pub mod histogram;
mod model;
mod ratio;
pub mod report;
pub mod types;
pub mod validate;

pub use cascade::{ParentUpdate, Rollup, SessionPlan, Shift, Tally};
pub use duration::{ClockSpan, SECONDS_PER_DAY, duration_seconds};
pub use histogram::{Histogram, HistogramError, Resolution, build_histogram};
pub use model::{
    Day, DayChanges, NewDay, NewSession, NewStage, NewSubject, NewUser, Session, SessionChanges,
    Stage, StageChanges, Subject, SubjectChanges, User, UserChanges,
};
pub use ratio::Ratio;
pub use report::{
    Dashboard, DayMaxima, StageSummary, SubjectSummary, Tenths, TimeDistribution,
    format_hours_minutes,
};
pub use types::{
    DayId, RowId, SessionId, StageId, SubjectId, UserId, ValidationError, ValidationErrors,
};
