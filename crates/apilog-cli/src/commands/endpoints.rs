use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::{OutputFormat, export};
use anyhow::Result;
use apilog_core::aggregate::{EndpointCount, EndpointPivot, TrafficAggregator};
use apilog_core::normalize::NormalizerConfig;
use std::path::{Path, PathBuf};

/// API requests per verb and endpoint, busiest first
pub fn endpoint_counts(
    file: &Path,
    config: &NormalizerConfig,
) -> Result<CommandReport<Vec<EndpointCount>>> {
    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());
    let counts = aggregator.count_by_verb_and_endpoint(&log.records);

    Ok(CommandReport::new(file, &log, counts))
}

/// Endpoint x verb table of the same counts
pub fn endpoint_pivot(
    file: &Path,
    config: &NormalizerConfig,
) -> Result<CommandReport<EndpointPivot>> {
    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());
    let pivot = aggregator.endpoint_pivot(&log.records);

    Ok(CommandReport::new(file, &log, pivot))
}

pub fn execute(
    file: &Path,
    pivot: bool,
    output: Option<PathBuf>,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing endpoint traffic in {}", file.display());

    if pivot {
        let report = endpoint_pivot(file, config)?;

        if let Some(path) = output {
            export::write_pivot(&path, &report.result)?;
        }

        match format {
            OutputFormat::Json => output_json(&report)?,
            OutputFormat::Table => output_pivot_table(&report)?,
            OutputFormat::Pretty => output_pivot_pretty(&report),
        }
    } else {
        let report = endpoint_counts(file, config)?;

        if let Some(path) = output {
            export::write_rows(&path, &report.result)?;
        }

        match format {
            OutputFormat::Json => output_json(&report)?,
            OutputFormat::Table => output_table(&report)?,
            OutputFormat::Pretty => output_pretty(&report),
        }
    }

    Ok(())
}

fn output_pretty(report: &CommandReport<Vec<EndpointCount>>) {
    use console::style;

    println!("\n{}", style("API Endpoints").bold().cyan());
    println!("{}", style("=============").cyan());
    println!("  File: {}\n", report.file);

    if report.result.is_empty() {
        println!("  {}", style("No API traffic found").dim());
    }

    let total: usize = report.result.iter().map(|r| r.count).sum();
    for row in &report.result {
        println!(
            "  {:>6}  {:<7} {}",
            style(row.count).yellow(),
            style(&row.verb).green(),
            row.endpoint
        );
    }

    if total > 0 {
        println!(
            "\n  {} requests across {} verb/endpoint pairs",
            total,
            report.result.len()
        );
    }

    print_skipped_pretty(report);
}

fn output_table(report: &CommandReport<Vec<EndpointCount>>) -> Result<()> {
    let mut table = table_writer();
    table.write_record(["Verb", "Endpoint", "Requests"])?;
    for row in &report.result {
        table.write_record([
            row.verb.as_str(),
            row.endpoint.as_str(),
            row.count.to_string().as_str(),
        ])?;
    }
    write_skipped_table(&mut table, report)
}

fn output_pivot_pretty(report: &CommandReport<EndpointPivot>) {
    use console::style;

    let pivot = &report.result;

    println!("\n{}", style("API Endpoints by Verb").bold().cyan());
    println!("  File: {}\n", report.file);

    if pivot.endpoints.is_empty() {
        println!("  {}", style("No API traffic found").dim());
        print_skipped_pretty(report);
        return;
    }

    let width = pivot
        .endpoints
        .iter()
        .map(|e| e.as_str().len())
        .max()
        .unwrap_or(0);

    print!("  {:<width$}", "", width = width);
    for verb in &pivot.verbs {
        print!(" {:>7}", style(verb).green());
    }
    println!();

    for (endpoint, counts) in pivot.endpoints.iter().zip(&pivot.counts) {
        print!("  {:<width$}", endpoint.as_str(), width = width);
        for count in counts {
            if *count == 0 {
                print!(" {:>7}", style("-").dim());
            } else {
                print!(" {:>7}", count);
            }
        }
        println!();
    }

    print_skipped_pretty(report);
}

fn output_pivot_table(report: &CommandReport<EndpointPivot>) -> Result<()> {
    let pivot = &report.result;
    let mut table = table_writer();

    let mut header = vec!["Endpoint".to_string()];
    header.extend(pivot.verbs.iter().cloned());
    table.write_record(&header)?;

    for (endpoint, counts) in pivot.endpoints.iter().zip(&pivot.counts) {
        let mut row = vec![endpoint.to_string()];
        row.extend(counts.iter().map(|c| c.to_string()));
        table.write_record(&row)?;
    }
    write_skipped_table(&mut table, report)
}
