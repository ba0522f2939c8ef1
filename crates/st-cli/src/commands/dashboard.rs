//! `st dashboard`: the user's time distribution, day maxima and the
//! time-of-day histogram of completed sessions.

use std::io::Write;

use anyhow::{Context, Result};
use st_core::{Dashboard, Histogram, Resolution, User, format_hours_minutes};
use st_db::Database;

use super::util::{format_percent, write_json};

/// Widest histogram bar, in characters.
const BAR_WIDTH: i64 = 40;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &User,
    steps_per_hour: u32,
    json: bool,
) -> Result<()> {
    let resolution = Resolution::new(steps_per_hour).context("invalid --steps-per-hour")?;
    let dashboard = db.dashboard(user.id, resolution)?;

    if json {
        return write_json(writer, &dashboard);
    }
    format_dashboard(writer, &dashboard)
}

fn format_dashboard<W: Write>(writer: &mut W, dashboard: &Dashboard) -> Result<()> {
    writeln!(writer, "Dashboard for {}", dashboard.username)?;
    writeln!(
        writer,
        "Time usage percentage: {}",
        format_percent(dashboard.time_usage_ratio, 1)
    )?;
    writeln!(writer)?;

    writeln!(writer, "Time distribution")?;
    for (label, hours) in dashboard.distribution.entries() {
        writeln!(writer, "{label}: {hours}")?;
    }
    writeln!(writer)?;

    let maxima = &dashboard.maxima;
    writeln!(writer, "Best days")?;
    writeln!(
        writer,
        "Max usable time: {}",
        format_hours_minutes(maxima.max_usable_time)
    )?;
    writeln!(
        writer,
        "Max study time: {}",
        format_hours_minutes(maxima.max_study_time)
    )?;
    writeln!(
        writer,
        "Max time usage percentage: {}",
        format_percent(maxima.max_time_usage_ratio, 1)
    )?;
    writeln!(writer)?;

    format_histogram(writer, &dashboard.histogram)
}

/// Prints the non-empty buckets, with bars scaled to the busiest one.
fn format_histogram<W: Write>(writer: &mut W, histogram: &Histogram) -> Result<()> {
    writeln!(
        writer,
        "Sessions by time of day ({} per hour)",
        histogram.steps_per_hour
    )?;
    let peak = histogram.peak();
    if peak == 0 {
        writeln!(writer, "No completed sessions.")?;
        return Ok(());
    }

    for (label, count) in histogram.labels.iter().zip(&histogram.counts) {
        if *count == 0 {
            continue;
        }
        let width = (count * BAR_WIDTH / peak).max(1);
        let bar = "#".repeat(usize::try_from(width).unwrap_or(1));
        writeln!(writer, "{label:<6} {count:>3} {bar}")?;
    }
    Ok(())
}
