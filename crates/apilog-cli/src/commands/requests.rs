use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::{OutputFormat, export};
use anyhow::{Result, bail};
use apilog_core::aggregate::{ClientCount, TrafficAggregator};
use apilog_core::normalize::NormalizerConfig;
use std::path::{Path, PathBuf};

/// Count requests per client whose URL contains `keyword`
pub fn count_requests(
    file: &Path,
    keyword: &str,
    config: &NormalizerConfig,
) -> Result<CommandReport<Vec<ClientCount>>> {
    if keyword.is_empty() {
        bail!("Keyword must not be empty");
    }

    let log = load_log(file)?;
    let aggregator = TrafficAggregator::with_config(config.clone());
    let counts = aggregator.count_by_keyword(&log.records, keyword);

    Ok(CommandReport::new(file, &log, counts))
}

pub fn execute(
    file: &Path,
    keyword: &str,
    output: Option<PathBuf>,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Counting '{}' requests in {}", keyword, file.display());

    let report = count_requests(file, keyword, config)?;

    if let Some(path) = output {
        export::write_rows(&path, &report.result)?;
    }

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report)?,
        OutputFormat::Pretty => output_pretty(&report, keyword),
    }

    Ok(())
}

fn output_pretty(report: &CommandReport<Vec<ClientCount>>, keyword: &str) {
    use console::style;

    println!(
        "\n{}",
        style(format!("Requests containing '{}'", keyword))
            .bold()
            .cyan()
    );
    println!("  File: {}\n", report.file);

    if report.result.is_empty() {
        println!("  {}", style("No matching requests").dim());
    }

    for row in &report.result {
        println!("  {:>6}  {}", style(row.count).yellow(), row.client);
    }

    print_skipped_pretty(report);
}

fn output_table(report: &CommandReport<Vec<ClientCount>>) -> Result<()> {
    let mut table = table_writer();
    table.write_record(["Client", "Requests"])?;
    for row in &report.result {
        table.write_record([row.client.as_str(), row.count.to_string().as_str()])?;
    }
    write_skipped_table(&mut table, report)
}
