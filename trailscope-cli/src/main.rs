//! Trailscope CLI
//!
//! Entry point for the `trailscope` binary.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use trailscope_core::config::{GeneralConfig, TrailscopeConfig};

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // unreadable or invalid config: default logging, the command reports the error
    let mut general = match TrailscopeConfig::from_file(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e:#}, falling back to default logging");
        let _ = logging::init_tracing(&GeneralConfig::default());
    }

    tracing::debug!(config = %cli.config.display(), "trailscope starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Collect(args) => commands::collect::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        use colored::Colorize;

        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}
