//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::util::{parse_clock, parse_duration};

/// Personal study-time tracker.
///
/// Records stages, days and study sessions, and keeps per-day, per-stage,
/// per-subject and per-user totals consistent on every change.
#[derive(Debug, Parser)]
#[command(name = "st", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user instead of the configured one.
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register, inspect, edit or remove users.
    #[command(subcommand)]
    User(UserAction),

    /// Manage stages (periods such as an academic term).
    #[command(subcommand)]
    Stage(NamedAction),

    /// Manage subjects.
    #[command(subcommand)]
    Subject(NamedAction),

    /// Manage days.
    #[command(subcommand)]
    Day(DayAction),

    /// Manage study sessions.
    #[command(subcommand)]
    Session(SessionAction),

    /// Show the time distribution, day maxima and the time-of-day histogram.
    Dashboard {
        /// Histogram buckets per hour (a divisor of 60).
        #[arg(long)]
        steps_per_hour: Option<u32>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a new user.
    Create {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Show the acting user's totals.
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Edit the acting user's profile.
    Edit {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },

    /// Delete the acting user and everything they recorded.
    Delete,
}

/// Actions shared by stages and subjects.
#[derive(Debug, Subcommand)]
pub enum NamedAction {
    /// Add a new record.
    Add {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Rename or re-describe a record.
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Remove the description.
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
    },

    /// Delete a record and everything under it.
    Rm { id: i64 },

    /// List records, newest first.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one record with its averages.
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DayAction {
    /// Log a day.
    Add {
        /// Calendar date (YYYY-MM-DD).
        date: NaiveDate,

        /// Stage the day belongs to.
        #[arg(long)]
        stage: i64,

        /// Time spent working, e.g. 90m, 1h or 1h30m.
        #[arg(long, value_parser = parse_duration, default_value = "0m")]
        worktime: i64,

        /// Wake-up time (HH:MM).
        #[arg(long, value_parser = parse_clock)]
        start: NaiveTime,

        /// Bed time (HH:MM).
        #[arg(long, value_parser = parse_clock)]
        end: Option<NaiveTime>,

        /// Whether the end falls on the next calendar day. Defaults to `no`
        /// when `--end` is given and `unset` otherwise.
        #[arg(long, value_enum)]
        next_day: Option<NextDay>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Edit a logged day.
    Edit {
        id: i64,

        #[arg(long)]
        stage: Option<i64>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, value_parser = parse_duration)]
        worktime: Option<i64>,

        #[arg(long, value_parser = parse_clock)]
        start: Option<NaiveTime>,

        #[arg(long, value_parser = parse_clock)]
        end: Option<NaiveTime>,

        /// Remove the end time.
        #[arg(long, conflicts_with = "end")]
        clear_end: bool,

        #[arg(long, value_enum)]
        next_day: Option<NextDay>,

        #[arg(long)]
        comment: Option<String>,

        /// Remove the comment.
        #[arg(long, conflicts_with = "comment")]
        clear_comment: bool,
    },

    /// Delete a day and its sessions.
    Rm { id: i64 },

    /// List days, newest first.
    List {
        /// Only days of this stage.
        #[arg(long)]
        stage: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Show one day.
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Log a study session.
    Add {
        #[arg(long)]
        day: i64,

        #[arg(long)]
        subject: i64,

        #[arg(long, value_parser = parse_clock)]
        start: NaiveTime,

        /// Leave out to record a session still in progress.
        #[arg(long, value_parser = parse_clock)]
        end: Option<NaiveTime>,

        /// Defaults to `no` when `--end` is given and `unset` otherwise.
        #[arg(long, value_enum)]
        next_day: Option<NextDay>,
    },

    /// Edit a session, possibly moving it to another day or subject.
    Edit {
        id: i64,

        #[arg(long)]
        day: Option<i64>,

        #[arg(long)]
        subject: Option<i64>,

        #[arg(long, value_parser = parse_clock)]
        start: Option<NaiveTime>,

        #[arg(long, value_parser = parse_clock)]
        end: Option<NaiveTime>,

        /// Remove the end time.
        #[arg(long, conflicts_with = "end")]
        clear_end: bool,

        #[arg(long, value_enum)]
        next_day: Option<NextDay>,
    },

    /// Delete a session.
    Rm { id: i64 },

    /// List sessions, newest first.
    List {
        #[arg(long)]
        day: Option<i64>,

        #[arg(long)]
        subject: Option<i64>,

        #[arg(long)]
        json: bool,
    },
}

/// The tri-state "ends on the next calendar day" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NextDay {
    Yes,
    No,
    Unset,
}

impl NextDay {
    pub const fn flag(self) -> Option<bool> {
        match self {
            Self::Yes => Some(true),
            Self::No => Some(false),
            Self::Unset => None,
        }
    }

    /// The flag to store for a new interval when `--next-day` was omitted.
    pub const fn or_default_for(choice: Option<Self>, end: Option<NaiveTime>) -> Option<bool> {
        match (choice, end) {
            (Some(choice), _) => choice.flag(),
            (None, Some(_)) => Some(false),
            (None, None) => None,
        }
    }
}
