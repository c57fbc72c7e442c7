use super::{
    CommandReport, load_log, output_json, print_skipped_pretty, table_writer,
    write_skipped_table,
};
use crate::OutputFormat;
use anyhow::Result;
use apilog_core::normalize::NormalizerConfig;
use apilog_core::search::{
    self, DailySeries, SearchAnalyzer, SearchConfig, SectionCounts, SectionSeries, ValueCount,
};
use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_TOP_QUERIES: usize = 20;

/// Which summary of search traffic to produce
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SearchView {
    /// Searches per section
    Sections,
    /// Searched categories
    Categories,
    /// Most frequent query strings
    Queries,
    /// Searches per day
    Daily,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchSummary {
    Counts(Vec<ValueCount>),
    BySection(Vec<SectionCounts>),
    Daily(DailySeries),
    DailyBySection(Vec<SectionSeries>),
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub view: SearchView,
    /// Break categories, queries or days down per section
    pub split: bool,
    pub top: usize,
    pub action: Option<String>,
}

pub fn analyze_search(
    file: &Path,
    options: &SearchOptions,
    config: &NormalizerConfig,
) -> Result<CommandReport<SearchSummary>> {
    let log = load_log(file)?;

    let mut search_config = SearchConfig::default();
    if let Some(action) = &options.action {
        search_config.action = action.clone();
    }

    let analyzer = SearchAnalyzer::with_configs(search_config, config.clone());
    let events = analyzer.extract(&log.records);

    let summary = events.map(|events| match (options.view, options.split) {
        (SearchView::Sections, _) => SearchSummary::Counts(search::section_counts(&events)),
        (SearchView::Categories, false) => SearchSummary::Counts(search::category_counts(&events)),
        (SearchView::Categories, true) => {
            SearchSummary::BySection(search::category_counts_by_section(&events))
        }
        (SearchView::Queries, false) => {
            SearchSummary::Counts(search::query_counts(&events, options.top))
        }
        (SearchView::Queries, true) => {
            SearchSummary::BySection(search::query_counts_by_section(&events, options.top))
        }
        (SearchView::Daily, false) => SearchSummary::Daily(search::daily_counts(&events)),
        (SearchView::Daily, true) => {
            SearchSummary::DailyBySection(search::daily_counts_by_section(&events))
        }
    });

    Ok(CommandReport::new(file, &log, summary))
}

pub fn execute(
    file: &Path,
    options: &SearchOptions,
    config: &NormalizerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing search traffic in {}", file.display());

    let report = analyze_search(file, options, config)?;

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report)?,
        OutputFormat::Pretty => output_pretty(&report, options.view),
    }

    Ok(())
}

fn title(view: SearchView) -> &'static str {
    match view {
        SearchView::Sections => "Searches by Section",
        SearchView::Categories => "Searched Categories",
        SearchView::Queries => "Top Search Queries",
        SearchView::Daily => "Searches per Day",
    }
}

fn output_pretty(report: &CommandReport<SearchSummary>, view: SearchView) {
    use console::style;

    println!("\n{}", style(title(view)).bold().cyan());
    println!("  File: {}", report.file);

    match &report.result {
        SearchSummary::Counts(counts) => {
            println!();
            print_counts(counts);
        }
        SearchSummary::BySection(sections) => {
            for section in sections {
                println!("\n{}", style(&section.section).bold());
                print_counts(&section.counts);
            }
        }
        SearchSummary::Daily(series) => {
            println!();
            print_series(series);
        }
        SearchSummary::DailyBySection(sections) => {
            for section in sections {
                println!("\n{}", style(&section.section).bold());
                print_series(&section.series);
            }
        }
    }

    print_skipped_pretty(report);
}

fn print_counts(counts: &[ValueCount]) {
    use console::style;

    if counts.is_empty() {
        println!("  {}", style("No searches found").dim());
    }
    for row in counts {
        println!("  {:>6}  {}", style(row.count).yellow(), row.value);
    }
}

fn print_series(series: &DailySeries) {
    use console::style;

    if series.days.is_empty() {
        println!("  {}", style("No searches found").dim());
        return;
    }
    for day in &series.days {
        println!("  {}  {:>6}", day.date, style(day.count).yellow());
    }
    println!("  {}  {:>6.2}", style("mean      ").dim(), series.mean);
}

fn output_table(report: &CommandReport<SearchSummary>) -> Result<()> {
    let mut table = table_writer();

    match &report.result {
        SearchSummary::Counts(counts) => {
            table.write_record(["Value", "Count"])?;
            for row in counts {
                table.write_record([row.value.as_str(), row.count.to_string().as_str()])?;
            }
        }
        SearchSummary::BySection(sections) => {
            table.write_record(["Section", "Value", "Count"])?;
            for section in sections {
                for row in &section.counts {
                    table.write_record([
                        section.section.as_str(),
                        row.value.as_str(),
                        row.count.to_string().as_str(),
                    ])?;
                }
            }
        }
        SearchSummary::Daily(series) => {
            table.write_record(["Date", "Count"])?;
            for day in &series.days {
                table.write_record([day.date.to_string(), day.count.to_string()])?;
            }
            table.write_record(["Mean".to_string(), series.mean.to_string()])?;
        }
        SearchSummary::DailyBySection(sections) => {
            table.write_record(["Section", "Date", "Count"])?;
            for section in sections {
                for day in &section.series.days {
                    table.write_record([
                        section.section.clone(),
                        day.date.to_string(),
                        day.count.to_string(),
                    ])?;
                }
            }
        }
    }

    write_skipped_table(&mut table, report)
}
