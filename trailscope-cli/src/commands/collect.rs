//! `trailscope collect` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use trailscope_collector::{
    AnySink, CloudTrailClient, CollectionSummary, CollectorBuilder, CollectorConfig, DropStats,
    S3ObjectStore, SinkOutcome, SourceReport, aws_sdk_config,
};
use trailscope_core::config::{SinkKind, TrailscopeConfig};
use trailscope_core::error::TrailscopeError;
use trailscope_core::types::DateRange;

use crate::cli::{CollectArgs, OutputFormat, SinkArg};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Capacity of the progress channel between the collector and the printer task.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Execute the `collect` command.
///
/// The date range is validated before the configuration is read, so a bad
/// `--start`/`--end` never touches the network.
///
/// # Errors
///
/// * `CliError::Core` for range, configuration, upstream or cancellation errors
/// * `CliError::PartialFailure` if the run finished but a source failed
pub async fn execute(
    args: CollectArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let range = DateRange::parse(&args.start, &args.end).map_err(TrailscopeError::from)?;

    let mut config = TrailscopeConfig::load(config_path).await?;
    apply_overrides(&mut config, &args);
    config.require_collection_settings()?;

    info!(
        range = %range,
        sink = ?config.sink.kind,
        "starting collection"
    );

    let sdk_config = aws_sdk_config(&config.aws).await;
    let sink = AnySink::from_config(&config.sink).await?;
    let collector = CollectorBuilder::new(CollectorConfig::from_core(&config))
        .object_store(Arc::new(S3ObjectStore::new(&sdk_config)))
        .audit_trail(Arc::new(CloudTrailClient::new(&sdk_config)))
        .sink(sink)
        .build()?;

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let printer = tokio::spawn(print_progress(progress_rx, writer.format()));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling collection");
            signal_token.cancel();
        }
    });

    let result = collector.run(&range, progress_tx, cancel).await;
    signal_task.abort();
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "progress printer task failed");
    }

    let summary = result?;
    let report = CollectionReport::from(&summary);
    writer.render(&report)?;

    if report.success {
        Ok(())
    } else {
        Err(CliError::PartialFailure(format!(
            "{} of {} sources failed",
            report.failed_sources(),
            report.sources.len()
        )))
    }
}

/// Apply `--sink` and `--output-dir` on top of the loaded configuration.
fn apply_overrides(config: &mut TrailscopeConfig, args: &CollectArgs) {
    if let Some(sink) = args.sink {
        config.sink.kind = match sink {
            SinkArg::Mongodb => SinkKind::Mongodb,
            SinkArg::File => SinkKind::File,
        };
    }
    if let Some(dir) = &args.output_dir {
        config.sink.output_dir = dir.display().to_string();
    }
}

/// Print progress lines in order until the collector drops its sender.
async fn print_progress(mut rx: mpsc::Receiver<String>, format: OutputFormat) {
    while let Some(line) = rx.recv().await {
        match format {
            OutputFormat::Text => println!("{line}"),
            // stdout is reserved for the JSON summary
            OutputFormat::Json => tracing::debug!(progress = %line.trim_start(), "progress"),
        }
    }
}

/// Result of one collection run.
#[derive(Debug, Serialize)]
pub struct CollectionReport {
    /// Run identifier (matches the `run_id` span field in logs)
    pub run_id: String,
    /// Collection label, e.g. `2025-05-01_to_2025-05-03`
    pub range: String,
    /// Whether every source was collected and stored
    pub success: bool,
    /// Total number of records collected
    pub total_records: usize,
    /// Per-source results in execution order
    pub sources: Vec<SourceRow>,
}

impl CollectionReport {
    fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.status == "failed").count()
    }
}

/// One line of the collection report.
#[derive(Debug, Serialize)]
pub struct SourceRow {
    pub source: String,
    pub status: String,
    pub records: usize,
    pub stored: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub stats: DropStats,
}

impl From<&SourceReport> for SourceRow {
    fn from(report: &SourceReport) -> Self {
        let stored = match &report.sink {
            None => "-".to_owned(),
            Some(SinkOutcome::Skipped) => "skipped".to_owned(),
            Some(SinkOutcome::Written(n)) => n.to_string(),
            Some(SinkOutcome::Failed(_)) => "failed".to_owned(),
        };
        let error = report.error.clone().or_else(|| match &report.sink {
            Some(SinkOutcome::Failed(reason)) => Some(reason.clone()),
            _ => None,
        });

        Self {
            source: report.source.as_str().to_owned(),
            status: if report.is_failed() { "failed" } else { "ok" }.to_owned(),
            records: report.records,
            stored,
            error,
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            stats: report.stats,
        }
    }
}

impl From<&CollectionSummary> for CollectionReport {
    fn from(summary: &CollectionSummary) -> Self {
        Self {
            run_id: summary.run_id.clone(),
            range: summary.range_label.clone(),
            success: !summary.has_failures(),
            total_records: summary.total_records(),
            sources: summary.reports.iter().map(SourceRow::from).collect(),
        }
    }
}

impl Render for CollectionReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w)?;
        writeln!(w, "Collection Summary: {}", self.range.bold())?;
        writeln!(w, "  Run ID: {}", self.run_id)?;
        writeln!(
            w,
            "  {:<12} {:<8} {:>10} {:>10} {:>10}",
            "SOURCE", "STATUS", "RECORDS", "STORED", "TIME(ms)"
        )?;
        writeln!(w, "  {}", "-".repeat(54))?;

        for row in &self.sources {
            let status = if row.status == "ok" {
                row.status.green()
            } else {
                row.status.red().bold()
            };
            writeln!(
                w,
                "  {:<12} {:<8} {:>10} {:>10} {:>10}",
                row.source, status, row.records, row.stored, row.elapsed_ms
            )?;
            if let Some(ref error) = row.error {
                writeln!(w, "    Error: {}", error.red())?;
            }
        }

        writeln!(w)?;
        writeln!(w, "  Total records: {}", self.total_records)?;
        if self.success {
            writeln!(w, "  Result: {}", "COMPLETE".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INCOMPLETE".red().bold())?;
        }
        Ok(())
    }
}
