//! `st stage`: manage stages and show their per-day averages.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use st_core::{
    DayMaxima, NewStage, Stage, StageChanges, StageId, StageSummary, User, format_hours_minutes,
};
use st_db::Database;

use super::util::{format_percent, write_json};
use crate::cli::NamedAction;

/// A stage with the figures its detail view shows.
#[derive(Debug, Serialize)]
pub struct StageDetail {
    #[serde(flatten)]
    pub stage: Stage,
    pub summary: StageSummary,
    pub maxima: DayMaxima,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    action: &NamedAction,
) -> Result<()> {
    match action {
        NamedAction::Add { name, description } => {
            let stage = db
                .create_stage(
                    user.id,
                    NewStage {
                        name: name.clone(),
                        description: description.clone(),
                    },
                )
                .with_context(|| format!("failed to add stage {name}"))?;
            writeln!(writer, "Added stage {} (id {})", stage.name, stage.id)?;
        }
        NamedAction::Edit {
            id,
            name,
            description,
            clear_description,
        } => {
            let changes = StageChanges {
                name: name.clone(),
                description: if *clear_description {
                    Some(None)
                } else {
                    description.clone().map(Some)
                },
            };
            let stage = db
                .update_stage(user.id, StageId::new(*id), changes)
                .with_context(|| format!("failed to edit stage {id}"))?;
            writeln!(writer, "Updated stage {} (id {})", stage.name, stage.id)?;
        }
        NamedAction::Rm { id } => {
            db.delete_stage(user.id, StageId::new(*id))
                .with_context(|| format!("failed to delete stage {id}"))?;
            writeln!(writer, "Deleted stage {id}")?;
        }
        NamedAction::List { json } => {
            let stages = db.stages(user.id)?;
            if *json {
                write_json(writer, &stages)?;
            } else {
                write_list(writer, &stages)?;
            }
        }
        NamedAction::Show { id, json } => {
            let stage = db.stage(user.id, StageId::new(*id))?;
            let maxima = db.day_maxima(user.id, Some(stage.id))?;
            let detail = StageDetail {
                summary: StageSummary::of(&stage),
                stage,
                maxima,
            };
            if *json {
                write_json(writer, &detail)?;
            } else {
                write_detail(writer, &detail)?;
            }
        }
    }
    Ok(())
}

fn write_list<W: Write>(writer: &mut W, stages: &[Stage]) -> Result<()> {
    if stages.is_empty() {
        writeln!(writer, "No stages.")?;
        return Ok(());
    }
    for stage in stages {
        writeln!(
            writer,
            "#{:<4} {:<20}  {} days  study {}  ratio {}",
            stage.id.get(),
            stage.name,
            stage.day_count,
            format_hours_minutes(stage.total_study_time),
            stage.time_usage_ratio
        )?;
    }
    Ok(())
}

fn write_detail<W: Write>(writer: &mut W, detail: &StageDetail) -> Result<()> {
    let StageDetail {
        stage,
        summary,
        maxima,
    } = detail;
    writeln!(writer, "Stage {} (id {})", stage.name, stage.id)?;
    if let Some(description) = &stage.description {
        writeln!(writer, "{description}")?;
    }
    writeln!(
        writer,
        "Days: {}  Sessions: {}",
        stage.day_count, stage.session_count
    )?;
    writeln!(
        writer,
        "Usable time: {} (avg {} per day)",
        format_hours_minutes(stage.total_usable_time),
        format_hours_minutes(summary.avg_usable_time)
    )?;
    writeln!(
        writer,
        "Study time: {} (avg {} per day)",
        format_hours_minutes(stage.total_study_time),
        format_hours_minutes(summary.avg_study_time)
    )?;
    writeln!(
        writer,
        "Work time: {}",
        format_hours_minutes(stage.total_work_time)
    )?;
    writeln!(
        writer,
        "Sessions per day: {}  Avg session: {}",
        summary.avg_sessions_per_day,
        format_hours_minutes(summary.avg_session_time)
    )?;
    writeln!(
        writer,
        "Time usage percentage: {} (best day {})",
        format_percent(stage.time_usage_ratio, 2),
        format_percent(maxima.max_time_usage_ratio, 2)
    )?;
    Ok(())
}
