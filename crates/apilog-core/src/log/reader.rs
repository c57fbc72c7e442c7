use super::types::LogRecord;
use crate::{Error, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub const COLUMN_CLIENT: &str = "client_ip";
pub const COLUMN_URL: &str = "request_url";
pub const COLUMN_VERB: &str = "request_verb";
pub const COLUMN_REQUEST_TIME: &str = "request_processing_time";
pub const COLUMN_TARGET_TIME: &str = "target_processing_time";
pub const COLUMN_RESPONSE_TIME: &str = "response_processing_time";
pub const COLUMN_TIME: &str = "time";

/// Columns every access log must provide
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COLUMN_CLIENT,
    COLUMN_URL,
    COLUMN_VERB,
    COLUMN_REQUEST_TIME,
    COLUMN_TARGET_TIME,
    COLUMN_RESPONSE_TIME,
    COLUMN_TIME,
];

/// A row that was dropped while loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

/// Records loaded from an access log, plus the rows that could not be parsed
#[derive(Debug, Clone, Default)]
pub struct LoadedLog {
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Fail with `InputFormat` unless every required column is in the header
fn check_columns(headers: &StringRecord) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .collect();

    if !missing.is_empty() {
        return Err(Error::InputFormat(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Decode one row into a record and validate it.
///
/// Negative durations are kept: load balancers write `-1` for requests they
/// could not forward, and those still count as traffic.
fn parse_row(row: &StringRecord, headers: &StringRecord) -> Result<LogRecord> {
    let mut record: LogRecord = row
        .deserialize(Some(headers))
        .map_err(|e| {
            let column = match e.kind() {
                csv::ErrorKind::Deserialize { err, .. } => {
                    err.field().and_then(|idx| headers.get(idx as usize))
                }
                _ => None,
            };
            match column {
                Some(column) => Error::RecordParse(format!("Invalid {}: {}", column, e)),
                None => Error::RecordParse(e.to_string()),
            }
        })?;

    if record.request_url.is_empty() {
        return Err(Error::RecordParse("Empty request URL".to_string()));
    }

    for (column, value) in [
        (COLUMN_REQUEST_TIME, record.request_processing_time),
        (COLUMN_TARGET_TIME, record.target_processing_time),
        (COLUMN_RESPONSE_TIME, record.response_processing_time),
    ] {
        if !value.is_finite() {
            return Err(Error::RecordParse(format!(
                "Invalid {}: '{}'",
                column, value
            )));
        }
    }

    record.request_verb = record.request_verb.to_uppercase();

    Ok(record)
}

pub struct LogReader;

impl LogReader {
    /// Read and parse an access log CSV file from the given path
    pub fn from_file(path: &Path) -> Result<LoadedLog> {
        tracing::debug!("Reading access log from: {}", path.display());

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse an access log from a CSV string
    pub fn from_str(content: &str) -> Result<LoadedLog> {
        tracing::debug!("Parsing access log from string");
        Self::from_reader(content.as_bytes())
    }

    /// Parse an access log from any reader.
    ///
    /// Missing required columns abort the load. Rows that fail to parse are
    /// skipped and reported in [`LoadedLog::skipped`].
    pub fn from_reader<R: Read>(reader: R) -> Result<LoadedLog> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        check_columns(&headers)?;
        let mut loaded = LoadedLog::default();

        for row in csv_reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    tracing::warn!("Skipping unreadable row at line {}: {}", line, e);
                    loaded.skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let line = row.position().map(|p| p.line()).unwrap_or_default();
            match parse_row(&row, &headers) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping row at line {}: {}", line, e);
                    loaded.skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Loaded {} records ({} skipped)",
            loaded.records.len(),
            loaded.skipped.len()
        );

        Ok(loaded)
    }
}
