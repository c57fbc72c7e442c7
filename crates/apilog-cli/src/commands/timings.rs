use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::{OutputFormat, export};
use anyhow::Result;
use apilog_core::aggregate::{TimingStats, TrafficAggregator};
use apilog_core::normalize::NormalizerConfig;
use std::path::{Path, PathBuf};

/// Processing time statistics per verb and endpoint
pub fn timing_stats(
    file: &Path,
    by_client: bool,
    config: &NormalizerConfig,
) -> Result<CommandReport<Vec<TimingStats>>> {
    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());
    let stats = aggregator.processing_time_stats(&log.records, by_client);

    Ok(CommandReport::new(file, &log, stats))
}

pub fn execute(
    file: &Path,
    by_client: bool,
    output: Option<PathBuf>,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing processing times in {}", file.display());

    let report = timing_stats(file, by_client, config)?;

    if let Some(path) = output {
        export::write_rows(&path, &report.result)?;
    }

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report, by_client)?,
        OutputFormat::Pretty => output_pretty(&report),
    }

    Ok(())
}

fn variance_display(variance: Option<f64>) -> String {
    variance
        .map(|v| format!("{:.6}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn output_pretty(report: &CommandReport<Vec<TimingStats>>) {
    use console::style;

    println!("\n{}", style("Processing Times").bold().cyan());
    println!("{}", style("================").cyan());
    println!("  File: {}\n", report.file);

    if report.result.is_empty() {
        println!("  {}", style("No API traffic found").dim());
    }

    for row in &report.result {
        let client = row
            .client
            .as_ref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!(
            "  {} {}{}",
            style(&row.verb).green(),
            row.endpoint,
            style(client).dim()
        );
        println!(
            "      requests: {}  mean: {:.6}  variance: {}",
            style(row.count).yellow(),
            row.mean,
            variance_display(row.variance)
        );
    }

    print_skipped_pretty(report);
}

fn output_table(report: &CommandReport<Vec<TimingStats>>, by_client: bool) -> Result<()> {
    let mut table = table_writer();

    if by_client {
        table.write_record(["Verb", "Endpoint", "Client", "Requests", "Mean", "Variance"])?;
    } else {
        table.write_record(["Verb", "Endpoint", "Requests", "Mean", "Variance"])?;
    }

    for row in &report.result {
        let mut record = vec![row.verb.clone(), row.endpoint.to_string()];
        if let Some(client) = &row.client {
            record.push(client.clone());
        }
        record.push(row.count.to_string());
        record.push(row.mean.to_string());
        record.push(row.variance.map(|v| v.to_string()).unwrap_or_default());
        table.write_record(&record)?;
    }

    write_skipped_table(&mut table, report)
}
