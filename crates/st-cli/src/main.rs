use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use st_cli::commands::{dashboard, day, session, stage, subject, user, util};
use st_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(st_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = st_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may run the binary's entry point repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let acting = cli.user.as_deref().or(config.user.as_deref());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::User(action) => user::run(&mut out, &mut db, acting, action)?,
        Commands::Stage(action) => {
            let owner = util::acting_user(&db, acting)?;
            stage::run(&mut out, &mut db, &owner, action)?;
        }
        Commands::Subject(action) => {
            let owner = util::acting_user(&db, acting)?;
            subject::run(&mut out, &mut db, &owner, action)?;
        }
        Commands::Day(action) => {
            let owner = util::acting_user(&db, acting)?;
            day::run(&mut out, &mut db, &owner, action)?;
        }
        Commands::Session(action) => {
            let owner = util::acting_user(&db, acting)?;
            session::run(&mut out, &mut db, &owner, action)?;
        }
        Commands::Dashboard {
            steps_per_hour,
            json,
        } => {
            let owner = util::acting_user(&db, acting)?;
            let steps = steps_per_hour.unwrap_or(config.steps_per_hour);
            dashboard::run(&mut out, &db, &owner, steps, *json)?;
        }
    }

    out.flush()?;
    Ok(())
}
