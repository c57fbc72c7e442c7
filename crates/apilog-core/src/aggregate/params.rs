use super::{Aggregate, ParameterValueCount, TrafficAggregator, count_values};
use crate::log::LogRecord;
use crate::normalize::NormalizedEndpoint;
use crate::{Error, Result};
use url::form_urlencoded;

/// First non-blank value of `name` in a form-urlencoded query
pub fn query_value(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

impl TrafficAggregator {
    /// Resolve a user-supplied endpoint path to its endpoint key.
    ///
    /// Accepts the path with or without a leading `/` or the base prefix, so
    /// `search`, `/search` and `/api/search` all name the same endpoint.
    pub fn endpoint_key(&self, endpoint_path: &str) -> NormalizedEndpoint {
        let path = endpoint_path.trim();
        let path = path.split(['?', '#']).next().unwrap_or(path);

        if path.starts_with('/') {
            self.normalizer.normalize_path(path)
        } else {
            self.normalizer.normalize_path(&format!("/{}", path))
        }
    }

    /// Distribution of one query parameter's values on one endpoint.
    ///
    /// Requests without the parameter land in the `None` bucket. Most
    /// frequent values first; ties keep first-seen order.
    pub fn parameter_value_counts(
        &self,
        records: &[LogRecord],
        endpoint_path: &str,
        parameter: &str,
    ) -> Result<Aggregate<Vec<ParameterValueCount>>> {
        if parameter.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "Parameter name must not be empty".to_string(),
            ));
        }

        let target = self.endpoint_key(endpoint_path);
        tracing::debug!("Counting '{}' values on {}", parameter, target);

        let classified = self.classify(records);

        let values = classified
            .rows
            .iter()
            .filter(|request| request.endpoint == target)
            .map(|request| {
                request
                    .record
                    .query()
                    .and_then(|query| query_value(query, parameter))
            });

        let rows: Vec<ParameterValueCount> = count_values(values)
            .into_iter()
            .map(|(value, count)| ParameterValueCount { value, count })
            .collect();

        tracing::info!(
            "Found {} distinct '{}' values on {}",
            rows.len(),
            parameter,
            target
        );

        Ok(Aggregate::new(rows, classified.skipped))
    }
}
