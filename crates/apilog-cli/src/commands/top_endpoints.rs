use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::{OutputFormat, export};
use anyhow::Result;
use apilog_core::aggregate::{ClientTopEndpoint, EndpointLeader, TrafficAggregator};
use apilog_core::normalize::NormalizerConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOP: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TopEndpoints {
    /// Each client's most requested endpoint
    pub clients: Vec<ClientTopEndpoint>,
    /// Endpoints ranked by the traffic of the clients that favor them
    pub leaders: Vec<EndpointLeader>,
}

pub fn top_endpoints(
    file: &Path,
    top: usize,
    config: &NormalizerConfig,
) -> Result<CommandReport<TopEndpoints>> {
    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());

    let result = aggregator
        .top_endpoint_per_client(&log.records)
        .map(|clients| TopEndpoints {
            leaders: TrafficAggregator::top_endpoints(&clients, top),
            clients,
        });

    Ok(CommandReport::new(file, &log, result))
}

pub fn execute(
    file: &Path,
    top: usize,
    output: Option<PathBuf>,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Finding top endpoints in {}", file.display());

    let report = top_endpoints(file, top, config)?;

    if let Some(path) = output {
        export::write_rows(&path, &report.result.clients)?;
    }

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report)?,
        OutputFormat::Pretty => output_pretty(&report, top),
    }

    Ok(())
}

fn output_pretty(report: &CommandReport<TopEndpoints>, top: usize) {
    use console::style;

    println!("\n{}", style("Top Endpoints").bold().cyan());
    println!("{}", style("=============").cyan());
    println!("  File: {}", report.file);

    if report.result.leaders.is_empty() {
        println!("\n  {}", style("No API traffic found").dim());
        print_skipped_pretty(report);
        return;
    }

    println!("\n{}", style(format!("Top {} endpoints:", top)).bold());
    for (i, leader) in report.result.leaders.iter().enumerate() {
        println!(
            "  {}. {} ({} requests from {} clients)",
            i + 1,
            style(&leader.endpoint).green(),
            style(leader.total).yellow(),
            leader.clients.len()
        );
    }

    println!("\n{}", style("Per client:").bold());
    for row in &report.result.clients {
        println!("  {:<16} {:>6}  {}", row.client, row.count, row.endpoint);
    }

    print_skipped_pretty(report);
}

fn output_table(report: &CommandReport<TopEndpoints>) -> Result<()> {
    let mut table = table_writer();

    table.write_record(["Rank", "Endpoint", "Requests", "Clients"])?;
    for (i, leader) in report.result.leaders.iter().enumerate() {
        table.write_record([
            (i + 1).to_string(),
            leader.endpoint.to_string(),
            leader.total.to_string(),
            leader.clients.len().to_string(),
        ])?;
    }

    table.flush()?;
    println!();
    table.write_record(["Client", "Endpoint", "Requests"])?;
    for row in &report.result.clients {
        table.write_record([
            row.client.as_str(),
            row.endpoint.as_str(),
            row.count.to_string().as_str(),
        ])?;
    }

    write_skipped_table(&mut table, report)
}
