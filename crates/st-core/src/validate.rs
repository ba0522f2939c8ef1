//! Validation rules run before any mutation reaches the cascade.
//!
//! The checks here are pure: anything needing the store (uniqueness, the
//! owner of a related row) is looked up by the caller and passed in as a
//! plain fact. Every rule appends to a shared [`ValidationErrors`] so the
//! caller can report all failures at once.

use crate::model::{Day, Session, User};
use crate::types::{UserId, ValidationErrors};

/// Maximum length of Stage and Subject names.
pub const NAME_MAX_CHARS: usize = 20;

/// Maximum length of descriptions and Day comments.
pub const TEXT_MAX_CHARS: usize = 100;

/// Maximum length of a username.
pub const USERNAME_MAX_CHARS: usize = 150;

pub const DAY_EXISTS: &str = "this day already exists";
pub const STAGE_EXISTS: &str = "this stage already exists";
pub const SUBJECT_EXISTS: &str = "this subject already exists";
pub const USERNAME_TAKEN: &str = "a user with that username already exists";
pub const EMAIL_TAKEN: &str = "a user with that email already exists";
pub const FOREIGN_OWNER: &str = "the related record does not belong to the current user";

/// Checks a Stage or Subject name.
pub fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.push("name", "must not be empty");
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.push("name", format!("must be at most {NAME_MAX_CHARS} characters"));
    }
}

/// Checks an optional free-text field (description, comment).
pub fn check_text(errors: &mut ValidationErrors, field: &'static str, text: Option<&str>) {
    if text.is_some_and(|text| text.chars().count() > TEXT_MAX_CHARS) {
        errors.push(field, format!("must be at most {TEXT_MAX_CHARS} characters"));
    }
}

/// Records a uniqueness failure when `taken` is true.
pub fn check_unique(
    errors: &mut ValidationErrors,
    field: &'static str,
    taken: bool,
    message: &str,
) {
    if taken {
        errors.push(field, message);
    }
}

/// Records an ownership failure when a related row belongs to someone else.
pub fn check_owner(
    errors: &mut ValidationErrors,
    field: &'static str,
    owner: UserId,
    expected: UserId,
) {
    if owner != expected {
        errors.push(field, FOREIGN_OWNER);
    }
}

/// Checks the profile fields of a User.
pub fn check_user(errors: &mut ValidationErrors, user: &User) {
    if user.username.trim().is_empty() {
        errors.push("username", "must not be empty");
    } else if user.username.chars().count() > USERNAME_MAX_CHARS {
        errors.push(
            "username",
            format!("must be at most {USERNAME_MAX_CHARS} characters"),
        );
    }
    if !is_plausible_email(&user.email) {
        errors.push("email", "enter a valid email address");
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

/// Checks a Day whose derived fields have been refreshed.
pub fn check_day(errors: &mut ValidationErrors, day: &Day) {
    if day.worktime < 0 {
        errors.push("worktime", "worktime should be non negative");
    }
    if day.span().is_complete() && day.usable_time < 0 {
        errors.push(
            "end",
            "usable time (end time - start time - worktime) must be non negative",
        );
    }
    check_text(errors, "comment", day.comment.as_deref());
}

/// Checks a Session whose duration has been refreshed.
pub fn check_session(errors: &mut ValidationErrors, session: &Session) {
    if session.span().is_complete() && session.duration <= 0 {
        errors.push("end", "duration (end time - start time) must be positive");
    }
}
