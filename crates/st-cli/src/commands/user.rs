//! `st user`: registration and profile management.

use std::io::Write;

use anyhow::{Context, Result};
use st_core::{NewUser, User, UserChanges, format_hours_minutes};
use st_db::Database;

use super::util::{acting_user, format_percent, write_json};
use crate::cli::UserAction;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    acting: Option<&str>,
    action: &UserAction,
) -> Result<()> {
    match action {
        UserAction::Create {
            username,
            email,
            first_name,
            last_name,
        } => {
            let user = db
                .create_user(NewUser {
                    username: username.clone(),
                    email: email.clone(),
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                })
                .with_context(|| format!("failed to register {username}"))?;
            writeln!(writer, "Created user {} (id {})", user.username, user.id)?;
        }
        UserAction::Show { json } => {
            let user = acting_user(db, acting)?;
            if *json {
                write_json(writer, &user)?;
            } else {
                write_user(writer, &user)?;
            }
        }
        UserAction::Edit {
            username,
            email,
            first_name,
            last_name,
        } => {
            let user = acting_user(db, acting)?;
            let changes = UserChanges {
                username: username.clone(),
                email: email.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
            };
            let user = db
                .update_user(user.id, changes)
                .context("failed to update profile")?;
            writeln!(writer, "Updated user {}", user.username)?;
        }
        UserAction::Delete => {
            let user = acting_user(db, acting)?;
            db.delete_user(user.id).context("failed to delete user")?;
            writeln!(writer, "Deleted user {}", user.username)?;
        }
    }
    Ok(())
}

fn write_user<W: Write>(writer: &mut W, user: &User) -> Result<()> {
    writeln!(writer, "User {} <{}>", user.username, user.email)?;
    let full_name = format!("{} {}", user.first_name, user.last_name);
    if !full_name.trim().is_empty() {
        writeln!(writer, "Name: {}", full_name.trim())?;
    }
    writeln!(
        writer,
        "Stages: {}  Subjects: {}  Days: {}  Sessions: {}",
        user.stage_count, user.subject_count, user.day_count, user.session_count
    )?;
    writeln!(
        writer,
        "Usable time: {}",
        format_hours_minutes(user.total_usable_time)
    )?;
    writeln!(
        writer,
        "Study time: {}",
        format_hours_minutes(user.total_study_time)
    )?;
    writeln!(
        writer,
        "Work time: {}",
        format_hours_minutes(user.total_work_time)
    )?;
    writeln!(
        writer,
        "Time usage percentage: {}",
        format_percent(user.time_usage_ratio, 1)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn run_to_string(db: &mut Database, acting: Option<&str>, action: &UserAction) -> String {
        let mut output = Vec::new();
        run(&mut output, db, acting, action).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn create(db: &mut Database, username: &str) -> String {
        run_to_string(
            db,
            None,
            &UserAction::Create {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Ada".to_string(),
                last_name: String::new(),
            },
        )
    }

    #[test]
    fn create_and_show_user() {
        let temp = tempfile::tempdir().unwrap();
        let mut db = Database::open(&temp.path().join("st.db")).unwrap();

        assert_snapshot!(create(&mut db, "fx"), @"Created user fx (id 1)");

        let output = run_to_string(&mut db, Some("fx"), &UserAction::Show { json: false });
        assert_snapshot!(output, @r"
        User fx <fx@example.com>
        Name: Ada
        Stages: 0  Subjects: 0  Days: 0  Sessions: 0
        Usable time: 0h, 0min
        Study time: 0h, 0min
        Work time: 0h, 0min
        Time usage percentage: 0.0%
        ");
    }

    #[test]
    fn show_json_exposes_totals() {
        let mut db = Database::open_in_memory().unwrap();
        create(&mut db, "fx");

        let output = run_to_string(&mut db, Some("fx"), &UserAction::Show { json: true });
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["username"], "fx");
        assert_eq!(value["day_count"], 0);
        assert_eq!(value["time_usage_ratio"], 0.0);
    }

    #[test]
    fn edit_then_delete_user() {
        let mut db = Database::open_in_memory().unwrap();
        create(&mut db, "fx");

        let output = run_to_string(
            &mut db,
            Some("fx"),
            &UserAction::Edit {
                username: Some("fy".to_string()),
                email: None,
                first_name: None,
                last_name: Some("Lovelace".to_string()),
            },
        );
        assert_snapshot!(output, @"Updated user fy");

        let output = run_to_string(&mut db, Some("fy"), &UserAction::Delete);
        assert_snapshot!(output, @"Deleted user fy");
        assert!(db.user_by_username("fy").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        create(&mut db, "fx");

        let mut output = Vec::new();
        let err = run(
            &mut output,
            &mut db,
            None,
            &UserAction::Create {
                username: "fx".to_string(),
                email: "other@example.com".to_string(),
                first_name: String::new(),
                last_name: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "failed to register fx");
        assert!(format!("{err:#}").contains("username"));
    }
}
