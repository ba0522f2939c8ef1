//! Core type definitions: row identifiers and validation errors.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field (`"name"`, `"day"`, `"end"`, ...).
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

/// The full set of field-level failures collected for one mutation.
///
/// Validation never stops at the first problem: every rule runs and the
/// caller gets all messages at once, so a form can be re-prompted in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty set.
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Records a failure for `field`.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    /// Returns true when no rule failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failures recorded.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if at least one failure concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// Converts the set into `Ok(())` when empty, or `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Behaviour shared by every row identifier.
pub trait RowId: Copy + fmt::Display + ToSql + FromSql {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Returns the raw row ID.
    fn raw(self) -> i64;

    /// Returns true for records not yet written to the store.
    fn is_unsaved(self) -> bool;
}

/// Generates an integer row ID newtype with common trait implementations.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident, $entity:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Placeholder carried by a record that has not been inserted yet.
            pub const UNSAVED: Self = Self(0);

            /// Entity name used in error messages.
            pub const ENTITY: &'static str = $entity;

            /// Wraps a raw row ID.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row ID.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Returns true for records not yet written to the store.
            pub const fn is_unsaved(self) -> bool {
                self.0 == Self::UNSAVED.0
            }
        }

        impl RowId for $name {
            const ENTITY: &'static str = $entity;

            fn raw(self) -> i64 {
                self.0
            }

            fn is_unsaved(self) -> bool {
                self.0 == Self::UNSAVED.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

define_row_id!(
    /// Identifier of a [`User`](crate::User) row.
    UserId, "user"
);

define_row_id!(
    /// Identifier of a [`Stage`](crate::Stage) row.
    StageId, "stage"
);

define_row_id!(
    /// Identifier of a [`Day`](crate::Day) row.
    DayId, "day"
);

define_row_id!(
    /// Identifier of a [`Session`](crate::Session) row.
    SessionId, "session"
);

define_row_id!(
    /// Identifier of a [`Subject`](crate::Subject) row.
    SubjectId, "subject"
);
