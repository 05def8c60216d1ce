//! Subcommand handlers.

pub mod collect;
pub mod config;
