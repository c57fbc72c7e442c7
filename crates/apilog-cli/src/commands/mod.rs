pub mod completion;
pub mod endpoints;
pub mod params;
pub mod requests;
pub mod search;
pub mod timings;
pub mod top_endpoints;

use anyhow::{Context, Result};
use apilog_core::aggregate::Aggregate;
use apilog_core::log::{LoadedLog, LogReader};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Result of one command run over an access log
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport<T> {
    pub file: String,
    /// Records that parsed
    pub records: usize,
    /// Rows the reader dropped (bad CSV or unparsable cells)
    pub skipped_rows: usize,
    /// Records dropped because their URL could not be normalized
    pub skipped_urls: usize,
    pub result: T,
}

impl<T> CommandReport<T> {
    pub fn new(file: &Path, log: &LoadedLog, aggregate: Aggregate<T>) -> Self {
        Self {
            file: file_name(file),
            records: log.records.len(),
            skipped_rows: log.skipped.len(),
            skipped_urls: aggregate.skipped,
            result: aggregate.rows,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_rows + self.skipped_urls
    }
}

/// Read an access log, failing on IO errors or missing columns
pub fn load_log(file: &Path) -> Result<LoadedLog> {
    let log = LogReader::from_file(file)
        .with_context(|| format!("Failed to read access log {}", file.display()))?;

    tracing::info!(
        "Loaded {} records from {} ({} rows skipped)",
        log.records.len(),
        file.display(),
        log.skipped.len()
    );

    Ok(log)
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}

/// Skipped-row footer shared by the pretty renderers
pub(crate) fn print_skipped_pretty<T>(report: &CommandReport<T>) {
    use console::style;

    if report.skipped() == 0 {
        println!("\n  {}", style("No rows skipped").dim());
    } else {
        println!(
            "\n  {} {} skipped ({} unreadable rows, {} unparsable URLs)",
            style("!").yellow().bold(),
            style(report.skipped()).yellow(),
            report.skipped_rows,
            report.skipped_urls
        );
    }
    println!();
}

/// CSV writer on stdout for the table renderers; sections may differ in width
pub(crate) fn table_writer() -> csv::Writer<io::Stdout> {
    csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(io::stdout())
}

/// Skipped-row trailer shared by the table renderers
pub(crate) fn write_skipped_table<T>(
    table: &mut csv::Writer<io::Stdout>,
    report: &CommandReport<T>,
) -> Result<()> {
    table.flush()?;
    println!();
    table.write_record(["Skipped Rows", report.skipped_rows.to_string().as_str()])?;
    table.write_record(["Skipped URLs", report.skipped_urls.to_string().as_str()])?;
    table.flush()?;
    Ok(())
}

pub(crate) fn output_json<T: Serialize>(report: &CommandReport<T>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
