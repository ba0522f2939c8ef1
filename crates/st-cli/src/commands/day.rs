//! `st day`: log days and inspect their budgets.

use std::io::Write;

use anyhow::{Context, Result};
use st_core::{Day, DayChanges, DayId, NewDay, StageId, User, format_hours_minutes};
use st_db::Database;

use super::util::{format_end, format_percent, write_json};
use crate::cli::{DayAction, NextDay};

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    action: &DayAction,
) -> Result<()> {
    match action {
        DayAction::Add {
            date,
            stage,
            worktime,
            start,
            end,
            next_day,
            comment,
        } => {
            let day = db
                .create_day(
                    user.id,
                    NewDay {
                        stage_id: StageId::new(*stage),
                        day: *date,
                        worktime: *worktime,
                        start: *start,
                        end: *end,
                        end_next_day: NextDay::or_default_for(*next_day, *end),
                        comment: comment.clone(),
                    },
                )
                .with_context(|| format!("failed to add day {date}"))?;
            writeln!(writer, "Added day {} (id {})", day.day, day.id)?;
        }
        DayAction::Edit {
            id,
            stage,
            date,
            worktime,
            start,
            end,
            clear_end,
            next_day,
            comment,
            clear_comment,
        } => {
            let changes = DayChanges {
                stage_id: stage.map(StageId::new),
                day: *date,
                worktime: *worktime,
                start: *start,
                end: if *clear_end { Some(None) } else { end.map(Some) },
                end_next_day: next_day.map(NextDay::flag),
                comment: if *clear_comment {
                    Some(None)
                } else {
                    comment.clone().map(Some)
                },
            };
            let day = db
                .update_day(user.id, DayId::new(*id), changes)
                .with_context(|| format!("failed to edit day {id}"))?;
            writeln!(writer, "Updated day {} (id {})", day.day, day.id)?;
        }
        DayAction::Rm { id } => {
            db.delete_day(user.id, DayId::new(*id))
                .with_context(|| format!("failed to delete day {id}"))?;
            writeln!(writer, "Deleted day {id}")?;
        }
        DayAction::List { stage, json } => {
            let days = db.days(user.id, stage.map(StageId::new))?;
            if *json {
                write_json(writer, &days)?;
            } else if days.is_empty() {
                writeln!(writer, "No days.")?;
            } else {
                for day in &days {
                    write_row(writer, day)?;
                }
            }
        }
        DayAction::Show { id, json } => {
            let day = db.day(user.id, DayId::new(*id))?;
            if *json {
                write_json(writer, &day)?;
            } else {
                write_detail(writer, &day)?;
            }
        }
    }
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, day: &Day) -> Result<()> {
    writeln!(
        writer,
        "#{:<4} {} {}  {}-{:<8} usable {}  study {}  ratio {}",
        day.id.get(),
        day.day,
        day.day.format("%a"),
        day.start.format("%H:%M"),
        format_end(day.end, day.end_next_day),
        format_hours_minutes(day.usable_time),
        format_hours_minutes(day.study_time),
        day.time_usage_ratio
    )?;
    Ok(())
}

fn write_detail<W: Write>(writer: &mut W, day: &Day) -> Result<()> {
    writeln!(
        writer,
        "Day {} ({}, id {}), stage {}",
        day.day,
        day.day.format("%A"),
        day.id,
        day.stage_id
    )?;
    writeln!(
        writer,
        "Awake: {} to {}",
        day.start.format("%H:%M"),
        format_end(day.end, day.end_next_day)
    )?;
    writeln!(writer, "Work time: {}", format_hours_minutes(day.worktime))?;
    writeln!(
        writer,
        "Usable time: {}",
        format_hours_minutes(day.usable_time)
    )?;
    writeln!(
        writer,
        "Study time: {} in {} sessions",
        format_hours_minutes(day.study_time),
        day.session_count
    )?;
    writeln!(
        writer,
        "Time usage percentage: {}",
        format_percent(day.time_usage_ratio, 1)
    )?;
    if let Some(comment) = &day.comment {
        writeln!(writer, "Comment: {comment}")?;
    }
    Ok(())
}
