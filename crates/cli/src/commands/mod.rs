//! Subcommand implementations

pub mod health;
pub mod model;
pub mod optimize;
pub mod scenarios;
