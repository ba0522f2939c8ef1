//! Study tracker CLI library.
//!
//! This crate provides the `st` command-line front end over `st-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, DayAction, NamedAction, NextDay, SessionAction, UserAction};
pub use config::Config;
