//! Search traffic analysis.
//!
//! Search calls look like `/api/<section>/<action>?queryString=..&category=..`.
//! Each one becomes a [`SearchEvent`]; the functions below summarize those
//! events by section, category, query text and day.

use crate::aggregate::{Aggregate, Grouped, count_values, query_value};
use crate::log::LogRecord;
use crate::normalize::{NormalizerConfig, PathNormalizer, is_ip_host};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_ACTION: &str = "fuzzySearch";
pub const DEFAULT_QUERY_PARAM: &str = "queryString";
pub const DEFAULT_CATEGORY_PARAM: &str = "category";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path segment marker of a search call
    pub action: String,
    pub query_param: String,
    pub category_param: String,
    /// Display names for raw section segments, `(raw, display)`
    pub section_aliases: Vec<(String, String)>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            action: DEFAULT_SEARCH_ACTION.to_string(),
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            category_param: DEFAULT_CATEGORY_PARAM.to_string(),
            section_aliases: vec![
                ("issues".to_string(), "media interaction".to_string()),
                ("services".to_string(), "service log".to_string()),
            ],
        }
    }
}

/// One search request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEvent {
    pub client: String,
    pub section: String,
    pub action: String,
    pub category: Option<String>,
    pub query: Option<String>,
    pub time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Value counts restricted to one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCounts {
    pub section: String,
    pub counts: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Events per calendar day, with days without events counted as 0
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DailySeries {
    pub days: Vec<DayCount>,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSeries {
    pub section: String,
    pub series: DailySeries,
}

pub struct SearchAnalyzer {
    config: SearchConfig,
    normalizer: PathNormalizer,
}

impl SearchAnalyzer {
    pub fn new(config: SearchConfig, normalizer: PathNormalizer) -> Self {
        Self { config, normalizer }
    }

    pub fn with_configs(search: SearchConfig, normalizer: NormalizerConfig) -> Self {
        Self::new(search, PathNormalizer::new(normalizer))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Pull search calls out of the log.
    ///
    /// Only API traffic addressed to a named host counts; direct-IP requests
    /// are health checks and scanners, not users.
    pub fn extract(&self, records: &[LogRecord]) -> Aggregate<Vec<SearchEvent>> {
        tracing::debug!("Extracting '{}' calls", self.config.action);

        let mut events = Vec::new();
        let mut skipped = 0;

        for record in records {
            let url = &record.request_url;
            if !self.normalizer.is_api(url) || is_ip_host(url) || !url.contains(&self.config.action)
            {
                continue;
            }

            let endpoint = match self.normalizer.normalize(url) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    tracing::warn!("Skipping search record from {}: {}", record.client_identifier, e);
                    skipped += 1;
                    continue;
                }
            };

            let segments: Vec<&str> = endpoint.as_str().split('/').skip(1).collect();
            let Some(action_idx) = segments
                .iter()
                .position(|segment| segment.contains(&self.config.action))
            else {
                // Marker only appeared in the query string
                continue;
            };

            let section = if action_idx == 0 {
                String::new()
            } else {
                self.section_name(segments[0])
            };

            let query = record.query();
            events.push(SearchEvent {
                client: record.client_identifier.clone(),
                section,
                action: segments[action_idx].to_string(),
                category: query.and_then(|q| query_value(q, &self.config.category_param)),
                query: query.and_then(|q| query_value(q, &self.config.query_param)),
                time: record.timestamp(),
            });
        }

        tracing::info!("Found {} search events ({} skipped)", events.len(), skipped);

        Aggregate::new(events, skipped)
    }

    fn section_name(&self, raw: &str) -> String {
        self.config
            .section_aliases
            .iter()
            .find(|(from, _)| from == raw)
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| raw.to_string())
    }
}

fn to_value_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<ValueCount> {
    count_values(values)
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect()
}

/// Events grouped by section, sections in first-seen order
fn by_section(events: &[SearchEvent]) -> Vec<(&str, Vec<&SearchEvent>)> {
    let mut sections: Grouped<&str, Vec<&SearchEvent>> = Grouped::new();
    for event in events {
        sections.entry(&event.section).push(event);
    }
    sections.into_vec()
}

/// How many searches each section received
pub fn section_counts(events: &[SearchEvent]) -> Vec<ValueCount> {
    to_value_counts(events.iter().map(|e| e.section.as_str()))
}

/// Searched categories; searches without a category are not counted
pub fn category_counts(events: &[SearchEvent]) -> Vec<ValueCount> {
    to_value_counts(events.iter().filter_map(|e| e.category.as_deref()))
}

pub fn category_counts_by_section(events: &[SearchEvent]) -> Vec<SectionCounts> {
    by_section(events)
        .into_iter()
        .map(|(section, events)| SectionCounts {
            section: section.to_string(),
            counts: to_value_counts(events.iter().filter_map(|e| e.category.as_deref())),
        })
        .collect()
}

/// The `top_n` most frequent query strings
pub fn query_counts(events: &[SearchEvent], top_n: usize) -> Vec<ValueCount> {
    let mut counts = to_value_counts(events.iter().filter_map(|e| e.query.as_deref()));
    counts.truncate(top_n);
    counts
}

pub fn query_counts_by_section(events: &[SearchEvent], top_n: usize) -> Vec<SectionCounts> {
    by_section(events)
        .into_iter()
        .map(|(section, events)| {
            let mut counts = to_value_counts(events.iter().filter_map(|e| e.query.as_deref()));
            counts.truncate(top_n);
            SectionCounts {
                section: section.to_string(),
                counts,
            }
        })
        .collect()
}

fn daily_series<'a>(events: impl IntoIterator<Item = &'a SearchEvent>) -> DailySeries {
    let mut dates = Vec::new();
    for event in events {
        match event.time {
            Some(time) => dates.push(time.date()),
            None => tracing::warn!("Search event from {} has no usable timestamp", event.client),
        }
    }

    let (Some(&first), Some(&last)) = (dates.iter().min(), dates.iter().max()) else {
        return DailySeries::default();
    };

    let span = (last - first).num_days() as usize + 1;
    let mut counts = vec![0usize; span];
    for date in &dates {
        counts[(*date - first).num_days() as usize] += 1;
    }

    let days: Vec<DayCount> = counts
        .into_iter()
        .enumerate()
        .map(|(offset, count)| DayCount {
            date: first + Duration::days(offset as i64),
            count,
        })
        .collect();

    let mean = dates.len() as f64 / days.len() as f64;

    DailySeries { days, mean }
}

/// Searches per day between the first and last search
pub fn daily_counts(events: &[SearchEvent]) -> DailySeries {
    daily_series(events)
}

/// One daily series per section, each spanning that section's own range
pub fn daily_counts_by_section(events: &[SearchEvent]) -> Vec<SectionSeries> {
    by_section(events)
        .into_iter()
        .map(|(section, events)| SectionSeries {
            section: section.to_string(),
            series: daily_series(events),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(client: &str, url: &str, time: &str) -> LogRecord {
        LogRecord {
            client_identifier: client.to_string(),
            request_url: url.to_string(),
            request_verb: "GET".to_string(),
            request_processing_time: 0.0,
            target_processing_time: 0.0,
            response_processing_time: 0.0,
            time: time.to_string(),
        }
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            record(
                "10.0.0.1",
                "https://app.example.com:443/api/issues/fuzzySearch?queryString=flood&category=Weather",
                "2024-03-01T09:00:00Z",
            ),
            record(
                "10.0.0.2",
                "https://app.example.com:443/api/services/fuzzySearch?queryString=pump%20repair&category=Maintenance",
                "2024-03-01T10:00:00Z",
            ),
            record(
                "10.0.0.1",
                "https://app.example.com:443/api/issues/fuzzySearch?queryString=flood&category=Weather",
                "2024-03-03T11:00:00Z",
            ),
            record(
                "10.0.0.3",
                "https://172.16.0.4:443/api/issues/fuzzySearch?queryString=scan",
                "2024-03-02T00:00:00Z",
            ),
            record(
                "10.0.0.1",
                "https://app.example.com:443/api/issues/list?from=fuzzySearch",
                "2024-03-02T00:00:00Z",
            ),
            record(
                "10.0.0.4",
                "https://app.example.com:443/api/issues/fuzzySearch?queryString=storm&category=Weather",
                "2024-03-03T12:00:00Z",
            ),
        ]
    }

    fn events() -> Vec<SearchEvent> {
        SearchAnalyzer::new(SearchConfig::default(), PathNormalizer::default())
            .extract(&sample())
            .rows
    }

    #[test]
    fn test_extract_filters_and_parses() {
        let events = events();

        // IP-host request and query-only marker are excluded
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].section, "media interaction");
        assert_eq!(events[0].action, "fuzzySearch");
        assert_eq!(events[0].query.as_deref(), Some("flood"));
        assert_eq!(events[0].category.as_deref(), Some("Weather"));
        assert_eq!(events[1].section, "service log");
        assert_eq!(events[1].query.as_deref(), Some("pump repair"));
    }

    #[test]
    fn test_section_and_category_counts() {
        let events = events();

        assert_eq!(
            section_counts(&events),
            vec![
                ValueCount {
                    value: "media interaction".to_string(),
                    count: 3
                },
                ValueCount {
                    value: "service log".to_string(),
                    count: 1
                },
            ]
        );

        let categories = category_counts(&events);
        assert_eq!(categories[0].value, "Weather");
        assert_eq!(categories[0].count, 3);

        let split = category_counts_by_section(&events);
        assert_eq!(split.len(), 2);
        assert_eq!(split[1].section, "service log");
        assert_eq!(split[1].counts[0].value, "Maintenance");
    }

    #[test]
    fn test_query_counts_top_n() {
        let events = events();

        let top = query_counts(&events, 1);
        assert_eq!(
            top,
            vec![ValueCount {
                value: "flood".to_string(),
                count: 2
            }]
        );

        let split = query_counts_by_section(&events, 10);
        assert_eq!(split[0].counts.len(), 2);
        assert_eq!(split[1].counts[0].value, "pump repair");
    }

    #[test]
    fn test_daily_counts_fill_gaps() {
        let series = daily_counts(&events());

        let counts: Vec<usize> = series.days.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![2, 0, 2]);
        assert_eq!(
            series.days[1].date,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert!((series.mean - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_counts_by_section() {
        let split = daily_counts_by_section(&events());

        assert_eq!(split[0].section, "media interaction");
        assert_eq!(split[0].series.days.len(), 3);
        assert_eq!(split[1].series.days.len(), 1);
        assert_eq!(split[1].series.mean, 1.0);
    }

    #[test]
    fn test_empty_series() {
        let series = daily_counts(&[]);
        assert!(series.days.is_empty());
        assert_eq!(series.mean, 0.0);
    }
}
