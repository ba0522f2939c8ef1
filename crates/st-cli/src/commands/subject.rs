//! `st subject`: manage subjects.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use st_core::{
    NewSubject, Subject, SubjectChanges, SubjectId, SubjectSummary, User, format_hours_minutes,
};
use st_db::Database;

use super::util::write_json;
use crate::cli::NamedAction;

#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub summary: SubjectSummary,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    action: &NamedAction,
) -> Result<()> {
    match action {
        NamedAction::Add { name, description } => {
            let subject = db
                .create_subject(
                    user.id,
                    NewSubject {
                        name: name.clone(),
                        description: description.clone(),
                    },
                )
                .with_context(|| format!("failed to add subject {name}"))?;
            writeln!(writer, "Added subject {} (id {})", subject.name, subject.id)?;
        }
        NamedAction::Edit {
            id,
            name,
            description,
            clear_description,
        } => {
            let changes = SubjectChanges {
                name: name.clone(),
                description: if *clear_description {
                    Some(None)
                } else {
                    description.clone().map(Some)
                },
            };
            let subject = db
                .update_subject(user.id, SubjectId::new(*id), changes)
                .with_context(|| format!("failed to edit subject {id}"))?;
            writeln!(
                writer,
                "Updated subject {} (id {})",
                subject.name, subject.id
            )?;
        }
        NamedAction::Rm { id } => {
            db.delete_subject(user.id, SubjectId::new(*id))
                .with_context(|| format!("failed to delete subject {id}"))?;
            writeln!(writer, "Deleted subject {id}")?;
        }
        NamedAction::List { json } => {
            let subjects = db.subjects(user.id)?;
            if *json {
                write_json(writer, &subjects)?;
            } else if subjects.is_empty() {
                writeln!(writer, "No subjects.")?;
            } else {
                for subject in &subjects {
                    writeln!(
                        writer,
                        "#{:<4} {:<20}  {} sessions  study {}",
                        subject.id.get(),
                        subject.name,
                        subject.session_count,
                        format_hours_minutes(subject.total_study_time)
                    )?;
                }
            }
        }
        NamedAction::Show { id, json } => {
            let subject = db.subject(user.id, SubjectId::new(*id))?;
            let detail = SubjectDetail {
                summary: SubjectSummary::of(&subject),
                subject,
            };
            if *json {
                write_json(writer, &detail)?;
            } else {
                let SubjectDetail { subject, summary } = &detail;
                writeln!(writer, "Subject {} (id {})", subject.name, subject.id)?;
                if let Some(description) = &subject.description {
                    writeln!(writer, "{description}")?;
                }
                writeln!(
                    writer,
                    "Sessions: {}  Study time: {}  Avg session: {}",
                    subject.session_count,
                    format_hours_minutes(subject.total_study_time),
                    format_hours_minutes(summary.avg_session_time)
                )?;
            }
        }
    }
    Ok(())
}
