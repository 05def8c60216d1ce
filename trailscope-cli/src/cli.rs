//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Trailscope -- collect cloud access, flow and audit logs for a date range.
///
/// Use `trailscope <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "trailscope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the trailscope.toml configuration file.
    #[arg(short, long, default_value = "trailscope.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Progress trace and human-readable summary.
    Text,
    /// Machine-readable JSON summary only.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect all three log sources for a date range and store them.
    Collect(CollectArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- collect ----

/// Run one collection: access logs, flow logs, then audit events.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// First day to collect (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day to collect, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,

    /// Override the configured sink.
    #[arg(long)]
    pub sink: Option<SinkArg>,

    /// Override the output directory of the file sink.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Sink selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// MongoDB (database per source, collection per range).
    Mongodb,
    /// JSON files under the output directory.
    File,
}

// ---- config ----

/// Manage trailscope configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, aws, access_log, flow_log, audit, geoip, sink).
        #[arg(long)]
        section: Option<String>,
    },
}
