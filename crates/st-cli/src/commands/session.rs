//! `st session`: log study sessions.

use std::io::Write;

use anyhow::{Context, Result};
use st_core::{
    DayId, NewSession, SessionChanges, SessionId, SubjectId, User, format_hours_minutes,
};
use st_db::{Database, SessionFilter};

use super::util::{format_end, write_json};
use crate::cli::{NextDay, SessionAction};

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &User,
    action: &SessionAction,
) -> Result<()> {
    match action {
        SessionAction::Add {
            day,
            subject,
            start,
            end,
            next_day,
        } => {
            let session = db
                .create_session(
                    user.id,
                    NewSession {
                        day_id: DayId::new(*day),
                        subject_id: SubjectId::new(*subject),
                        start: *start,
                        end: *end,
                        end_next_day: NextDay::or_default_for(*next_day, *end),
                    },
                )
                .context("failed to add session")?;
            writeln!(
                writer,
                "Added session {} ({})",
                session.id,
                format_hours_minutes(session.duration)
            )?;
        }
        SessionAction::Edit {
            id,
            day,
            subject,
            start,
            end,
            clear_end,
            next_day,
        } => {
            let changes = SessionChanges {
                day_id: day.map(DayId::new),
                subject_id: subject.map(SubjectId::new),
                start: *start,
                end: if *clear_end { Some(None) } else { end.map(Some) },
                end_next_day: next_day.map(NextDay::flag),
            };
            let session = db
                .update_session(user.id, SessionId::new(*id), changes)
                .with_context(|| format!("failed to edit session {id}"))?;
            writeln!(
                writer,
                "Updated session {} ({})",
                session.id,
                format_hours_minutes(session.duration)
            )?;
        }
        SessionAction::Rm { id } => {
            db.delete_session(user.id, SessionId::new(*id))
                .with_context(|| format!("failed to delete session {id}"))?;
            writeln!(writer, "Deleted session {id}")?;
        }
        SessionAction::List { day, subject, json } => {
            let filter = SessionFilter {
                day: day.map(DayId::new),
                subject: subject.map(SubjectId::new),
            };
            let sessions = db.sessions(user.id, filter)?;
            if *json {
                write_json(writer, &sessions)?;
            } else if sessions.is_empty() {
                writeln!(writer, "No sessions.")?;
            } else {
                for session in &sessions {
                    writeln!(
                        writer,
                        "#{:<4} day {:<4} subject {:<4} {}-{:<8} {}",
                        session.id.get(),
                        session.day_id.get(),
                        session.subject_id.get(),
                        session.start.format("%H:%M"),
                        format_end(session.end, session.end_next_day),
                        format_hours_minutes(session.duration)
                    )?;
                }
            }
        }
    }
    Ok(())
}
