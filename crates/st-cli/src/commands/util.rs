//! Shared utilities for CLI commands.

use std::io::Write;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use regex::Regex;
use serde::Serialize;
use st_core::{Ratio, User};
use st_db::Database;

/// Pre-compiled regex for durations such as `90m`, `1h` or `1h30m`.
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?$").unwrap());

/// Longest duration accepted on the command line (a week, in seconds).
const MAX_DURATION_SECONDS: i64 = 7 * 24 * 3600;

/// Parses a duration into seconds.
///
/// Supports `90m`, `1h` and `1h30m`.
pub fn parse_duration(s: &str) -> Result<i64> {
    let caps = DURATION_RE
        .captures(s.trim())
        .filter(|caps| caps.get(1).is_some() || caps.get(2).is_some());
    let Some(caps) = caps else {
        anyhow::bail!("Invalid duration: {s}. Use e.g. 90m, 1h or 1h30m");
    };

    let mut seconds: i64 = 0;
    for (group, unit) in [(1, 3600), (2, 60)] {
        if let Some(value) = caps.get(group) {
            let value: i64 = value
                .as_str()
                .parse()
                .context("failed to parse number in duration")?;
            seconds = value
                .checked_mul(unit)
                .and_then(|part| seconds.checked_add(part))
                .context("duration too large")?;
        }
    }

    if seconds > MAX_DURATION_SECONDS {
        anyhow::bail!("Duration too large: {s}");
    }
    Ok(seconds)
}

/// Parses a wall-clock time written as `HH:MM`.
pub fn parse_clock(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time: {s}. Use HH:MM, e.g. 07:30"))
}

/// Formats an optional end time, with `+1` when it falls on the next day.
pub fn format_end(end: Option<NaiveTime>, end_next_day: Option<bool>) -> String {
    match (end, end_next_day) {
        (None, _) => "-".to_string(),
        (Some(end), Some(true)) => format!("{}+1", end.format("%H:%M")),
        (Some(end), _) => end.format("%H:%M").to_string(),
    }
}

/// Formats a ratio as a percentage with one or two decimals.
pub fn format_percent(ratio: Ratio, decimals: u32) -> String {
    match decimals {
        0 => format!("{:.0}%", ratio.percent(0)),
        1 => format!("{:.1}%", ratio.percent(1)),
        _ => format!("{:.2}%", ratio.percent(2)),
    }
}

/// Looks up the user commands act as.
pub fn acting_user(db: &Database, username: Option<&str>) -> Result<User> {
    let Some(username) = username else {
        anyhow::bail!("No user selected. Pass --user or set `user` in the config file");
    };
    db.user_by_username(username)?
        .with_context(|| format!("Unknown user: {username}"))
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to serialize output")?;
    writeln!(writer)?;
    Ok(())
}
