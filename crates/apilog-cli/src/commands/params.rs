use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::{OutputFormat, export};
use anyhow::Result;
use apilog_core::aggregate::{ParameterValueCount, TrafficAggregator};
use apilog_core::normalize::{NormalizedEndpoint, NormalizerConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ParameterValues {
    pub endpoint: NormalizedEndpoint,
    pub parameter: String,
    pub values: Vec<ParameterValueCount>,
}

/// Distribution of one query parameter's values on one endpoint
pub fn parameter_values(
    file: &Path,
    endpoint: &str,
    parameter: &str,
    config: &NormalizerConfig,
) -> Result<CommandReport<ParameterValues>> {
    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());

    let values = aggregator
        .parameter_value_counts(&log.records, endpoint, parameter)?
        .map(|values| ParameterValues {
            endpoint: aggregator.endpoint_key(endpoint),
            parameter: parameter.to_string(),
            values,
        });

    Ok(CommandReport::new(file, &log, values))
}

pub fn execute(
    file: &Path,
    endpoint: &str,
    parameter: &str,
    output: Option<PathBuf>,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!(
        "Counting '{}' values on {} in {}",
        parameter,
        endpoint,
        file.display()
    );

    let report = parameter_values(file, endpoint, parameter, config)?;

    if let Some(path) = output {
        export::write_rows(&path, &report.result.values)?;
    }

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report)?,
        OutputFormat::Pretty => output_pretty(&report),
    }

    Ok(())
}

fn output_pretty(report: &CommandReport<ParameterValues>) {
    use console::style;

    let values = &report.result;

    println!(
        "\n{}",
        style(format!("'{}' on {}", values.parameter, values.endpoint))
            .bold()
            .cyan()
    );
    println!("  File: {}\n", report.file);

    if values.values.is_empty() {
        println!("  {}", style("No requests to this endpoint").dim());
    }

    for row in &values.values {
        let value = match &row.value {
            Some(value) => style(value.clone()),
            None => style("(not set)".to_string()).dim(),
        };
        println!("  {:>6}  {}", style(row.count).yellow(), value);
    }

    print_skipped_pretty(report);
}

fn output_table(report: &CommandReport<ParameterValues>) -> Result<()> {
    let mut table = table_writer();
    table.write_record(["Value", "Requests"])?;
    for row in &report.result.values {
        table.write_record([
            row.value.as_deref().unwrap_or(""),
            row.count.to_string().as_str(),
        ])?;
    }
    write_skipped_table(&mut table, report)
}
