use super::{Aggregate, Grouped, RunningStats, TimingStats, TrafficAggregator};
use crate::log::LogRecord;
use crate::normalize::NormalizedEndpoint;

type TimingKey<'a> = (&'a str, NormalizedEndpoint, Option<&'a str>);

impl TrafficAggregator {
    /// Mean and sample variance of total processing time per verb and
    /// endpoint, optionally split by client.
    ///
    /// Rows are sorted by verb, endpoint and client. Requests with a negative
    /// duration part never reached a backend; they are left out and counted
    /// in [`Aggregate::skipped`].
    pub fn processing_time_stats(
        &self,
        records: &[LogRecord],
        split_by_client: bool,
    ) -> Aggregate<Vec<TimingStats>> {
        tracing::debug!(
            "Analyzing processing times (split by client: {})",
            split_by_client
        );

        let classified = self.classify(records);

        let mut skipped = classified.skipped;
        let mut groups: Grouped<TimingKey<'_>, RunningStats> = Grouped::new();
        for request in &classified.rows {
            let record = request.record;
            let Some(total) = record.total_processing_time() else {
                tracing::debug!(
                    "No processing time for {} {}",
                    record.request_verb,
                    record.request_url
                );
                skipped += 1;
                continue;
            };
            let client = split_by_client.then_some(record.client_identifier.as_str());
            let key = (
                record.request_verb.as_str(),
                request.endpoint.clone(),
                client,
            );
            groups.entry(key).push(total);
        }

        let mut groups = groups.into_vec();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let rows: Vec<TimingStats> = groups
            .into_iter()
            .map(|((verb, endpoint, client), stats)| TimingStats {
                verb: verb.to_string(),
                endpoint,
                client: client.map(str::to_string),
                count: stats.count(),
                mean: stats.mean(),
                variance: stats.sample_variance(),
            })
            .collect();

        tracing::info!(
            "Processing time analysis complete: {} groups",
            rows.len()
        );

        Aggregate::new(rows, skipped)
    }
}
