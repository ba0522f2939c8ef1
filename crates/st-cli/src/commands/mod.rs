//! CLI subcommand implementations.

pub mod dashboard;
pub mod day;
pub mod session;
pub mod stage;
pub mod subject;
pub mod user;
pub mod util;
