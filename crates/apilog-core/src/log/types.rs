use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row of an access log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "client_ip")]
    pub client_identifier: String,
    pub request_url: String,
    pub request_verb: String,
    pub request_processing_time: f64,
    pub target_processing_time: f64,
    pub response_processing_time: f64,
    pub time: String,
}

impl LogRecord {
    /// Sum of the request, target and response processing times.
    ///
    /// `None` when any part is negative, which is how load balancers mark a
    /// request that never reached a backend.
    pub fn total_processing_time(&self) -> Option<f64> {
        let parts = [
            self.request_processing_time,
            self.target_processing_time,
            self.response_processing_time,
        ];
        if parts.iter().any(|part| *part < 0.0) {
            return None;
        }
        Some(parts.iter().sum())
    }

    /// Raw query string of the request URL, without the leading `?`
    pub fn query(&self) -> Option<&str> {
        let (_, rest) = self.request_url.split_once('?')?;
        // Fragments are never part of the query
        let query = rest.split('#').next().unwrap_or(rest);
        Some(query)
    }

    /// Parse the `time` column.
    ///
    /// Accepts RFC 3339 timestamps as well as the space- and `T`-separated
    /// forms without an offset. Returns `None` when none of them match.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.time.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }

        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}
