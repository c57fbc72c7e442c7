use super::{
    Aggregate, ClientCount, ClientTopEndpoint, EndpointCount, EndpointLeader, EndpointPivot,
    Grouped,
};
use crate::log::LogRecord;
use crate::normalize::{NormalizedEndpoint, NormalizerConfig, PathNormalizer};
use rayon::prelude::*;

/// An API record paired with its endpoint key
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub record: &'a LogRecord,
    pub endpoint: NormalizedEndpoint,
}

/// Folds access-log records into summary tables.
///
/// Operations borrow the records and build fresh results on every call.
/// Records whose URL cannot be normalized are logged, skipped and counted in
/// [`Aggregate::skipped`].
pub struct TrafficAggregator {
    pub(super) normalizer: PathNormalizer,
}

impl TrafficAggregator {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self::new(PathNormalizer::new(config))
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Keep API records and normalize their URLs.
    ///
    /// Normalization runs in parallel; the output keeps input order.
    pub fn classify<'a>(&self, records: &'a [LogRecord]) -> Aggregate<Vec<ApiRequest<'a>>> {
        tracing::debug!("Normalizing {} records", records.len());

        let normalized: Vec<_> = records
            .par_iter()
            .filter(|record| self.normalizer.is_api(&record.request_url))
            .map(|record| (record, self.normalizer.normalize(&record.request_url)))
            .collect();

        let mut rows = Vec::with_capacity(normalized.len());
        let mut skipped = 0;

        for (record, result) in normalized {
            match result {
                Ok(endpoint) => rows.push(ApiRequest { record, endpoint }),
                Err(e) => {
                    tracing::warn!("Skipping record from {}: {}", record.client_identifier, e);
                    skipped += 1;
                }
            }
        }

        tracing::debug!("{} API records, {} skipped", rows.len(), skipped);

        Aggregate::new(rows, skipped)
    }

    /// Requests per client whose raw URL contains `keyword` (case-sensitive).
    ///
    /// Most active clients first; ties keep first-seen order.
    pub fn count_by_keyword(
        &self,
        records: &[LogRecord],
        keyword: &str,
    ) -> Aggregate<Vec<ClientCount>> {
        tracing::debug!("Counting requests containing '{}'", keyword);

        let mut counts: Grouped<&str, usize> = Grouped::new();
        for record in records.iter().filter(|r| r.request_url.contains(keyword)) {
            *counts.entry(&record.client_identifier) += 1;
        }

        let mut rows: Vec<ClientCount> = counts
            .into_vec()
            .into_iter()
            .map(|(client, count)| ClientCount {
                client: client.to_string(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));

        tracing::info!("{} clients requested '{}'", rows.len(), keyword);

        Aggregate::new(rows, 0)
    }

    /// API requests grouped by verb and endpoint, busiest first.
    ///
    /// The sort is stable: equal counts keep first-seen group order.
    pub fn count_by_verb_and_endpoint(
        &self,
        records: &[LogRecord],
    ) -> Aggregate<Vec<EndpointCount>> {
        let classified = self.classify(records);

        let mut counts: Grouped<(&str, NormalizedEndpoint), usize> = Grouped::new();
        for request in &classified.rows {
            let key = (request.record.request_verb.as_str(), request.endpoint.clone());
            *counts.entry(key) += 1;
        }

        let mut rows: Vec<EndpointCount> = counts
            .into_vec()
            .into_iter()
            .map(|((verb, endpoint), count)| EndpointCount {
                verb: verb.to_string(),
                endpoint,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));

        tracing::info!(
            "Endpoint traffic complete: {} verb/endpoint groups",
            rows.len()
        );

        Aggregate::new(rows, classified.skipped)
    }

    /// Pivoted form of [`TrafficAggregator::count_by_verb_and_endpoint`]
    pub fn endpoint_pivot(&self, records: &[LogRecord]) -> Aggregate<EndpointPivot> {
        self.count_by_verb_and_endpoint(records)
            .map(|counts| EndpointPivot::from_counts(&counts))
    }

    /// Each client's most requested endpoint.
    ///
    /// Clients appear in first-seen order. When two endpoints tie, the one the
    /// client hit first wins.
    pub fn top_endpoint_per_client(
        &self,
        records: &[LogRecord],
    ) -> Aggregate<Vec<ClientTopEndpoint>> {
        let classified = self.classify(records);

        let mut per_client: Grouped<&str, Grouped<NormalizedEndpoint, usize>> = Grouped::new();
        for request in &classified.rows {
            *per_client
                .entry(&request.record.client_identifier)
                .entry(request.endpoint.clone()) += 1;
        }

        let mut rows = Vec::new();
        for (client, endpoints) in per_client.iter() {
            let mut best: Option<&(NormalizedEndpoint, usize)> = None;
            for candidate in endpoints.iter() {
                if best.is_none_or(|b| candidate.1 > b.1) {
                    best = Some(candidate);
                }
            }

            if let Some((endpoint, count)) = best {
                rows.push(ClientTopEndpoint {
                    client: client.to_string(),
                    endpoint: endpoint.clone(),
                    count: *count,
                });
            }
        }

        tracing::info!("Top endpoints found for {} clients", rows.len());

        Aggregate::new(rows, classified.skipped)
    }

    /// Rank endpoints by the summed counts of the clients whose top endpoint
    /// they are, keeping the `n` largest.
    pub fn top_endpoints(tops: &[ClientTopEndpoint], n: usize) -> Vec<EndpointLeader> {
        let mut by_endpoint: Grouped<&NormalizedEndpoint, Vec<ClientCount>> = Grouped::new();
        for top in tops {
            by_endpoint.entry(&top.endpoint).push(ClientCount {
                client: top.client.clone(),
                count: top.count,
            });
        }

        let mut leaders: Vec<EndpointLeader> = by_endpoint
            .into_vec()
            .into_iter()
            .map(|(endpoint, mut clients)| {
                clients.sort_by(|a, b| b.count.cmp(&a.count));
                EndpointLeader {
                    endpoint: endpoint.clone(),
                    total: clients.iter().map(|c| c.count).sum(),
                    clients,
                }
            })
            .collect();

        leaders.sort_by(|a, b| b.total.cmp(&a.total));
        leaders.truncate(n);
        leaders
    }
}

impl Default for TrafficAggregator {
    fn default() -> Self {
        Self::new(PathNormalizer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogReader;

    fn record(client: &str, verb: &str, url: &str) -> LogRecord {
        LogRecord {
            client_identifier: client.to_string(),
            request_url: url.to_string(),
            request_verb: verb.to_string(),
            request_processing_time: 0.0,
            target_processing_time: 0.0,
            response_processing_time: 0.0,
            time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            record("10.0.0.1", "GET", "https://app.example.com/api/users/1"),
            record("10.0.0.2", "GET", "https://app.example.com/api/users/2"),
            record("10.0.0.1", "POST", "https://app.example.com/api/orders"),
            record("10.0.0.3", "GET", "https://app.example.com/static/logo.png"),
            record("10.0.0.2", "GET", "https://app.example.com/api/orders?page=2"),
            record("10.0.0.2", "GET", "https://app.example.com/api/users/3"),
        ]
    }

    #[test]
    fn test_count_by_keyword() {
        let aggregator = TrafficAggregator::default();
        let result = aggregator.count_by_keyword(&sample(), "users");

        assert_eq!(result.skipped, 0);
        assert_eq!(
            result.rows,
            vec![
                ClientCount {
                    client: "10.0.0.2".to_string(),
                    count: 2
                },
                ClientCount {
                    client: "10.0.0.1".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_count_by_keyword_is_case_sensitive() {
        let aggregator = TrafficAggregator::default();
        let result = aggregator.count_by_keyword(&sample(), "Users");
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_count_by_verb_and_endpoint() {
        let aggregator = TrafficAggregator::default();
        let result = aggregator.count_by_verb_and_endpoint(&sample());

        let rows: Vec<(&str, &str, usize)> = result
            .rows
            .iter()
            .map(|r| (r.verb.as_str(), r.endpoint.as_str(), r.count))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("GET", "/users/{id}", 3),
                ("POST", "/orders", 1),
                ("GET", "/orders", 1),
            ]
        );
    }

    #[test]
    fn test_counts_sum_to_api_records() {
        let records = sample();
        let aggregator = TrafficAggregator::default();
        let result = aggregator.count_by_verb_and_endpoint(&records);

        let api_records = records
            .iter()
            .filter(|r| aggregator.normalizer().is_api(&r.request_url))
            .count();
        let total: usize = result.rows.iter().map(|r| r.count).sum();
        assert_eq!(total, api_records);
    }

    #[test]
    fn test_unparsable_url_is_skipped() {
        let mut records = sample();
        records.push(record("10.0.0.9", "GET", "https://[broken/api/users/1"));

        let aggregator = TrafficAggregator::default();
        let result = aggregator.count_by_verb_and_endpoint(&records);

        assert_eq!(result.skipped, 1);
        let total: usize = result.rows.iter().map(|r| r.count).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_endpoint_pivot() {
        let aggregator = TrafficAggregator::default();
        let pivot = aggregator.endpoint_pivot(&sample()).rows;

        assert_eq!(pivot.get("/orders", "GET"), 1);
        assert_eq!(pivot.get("/orders", "POST"), 1);
        assert_eq!(pivot.get("/users/{id}", "POST"), 0);
    }

    #[test]
    fn test_top_endpoint_per_client() {
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record("A", "GET", "/api/x"));
        }
        for _ in 0..5 {
            records.push(record("A", "GET", "/api/y"));
        }
        records.push(record("B", "GET", "/api/x"));

        let aggregator = TrafficAggregator::default();
        let tops = aggregator.top_endpoint_per_client(&records).rows;

        assert_eq!(tops.len(), 2);
        assert_eq!(tops[0].client, "A");
        assert_eq!(tops[0].endpoint, "/y");
        assert_eq!(tops[0].count, 5);
        assert_eq!(tops[1].client, "B");
        assert_eq!(tops[1].endpoint, "/x");
    }

    #[test]
    fn test_top_endpoint_tie_prefers_first_seen() {
        let records = vec![
            record("A", "GET", "/api/second"),
            record("A", "GET", "/api/first"),
            record("A", "GET", "/api/first"),
            record("A", "GET", "/api/second"),
        ];

        let aggregator = TrafficAggregator::default();
        let tops = aggregator.top_endpoint_per_client(&records).rows;
        assert_eq!(tops[0].endpoint, "/second");
        assert_eq!(tops[0].count, 2);
    }

    #[test]
    fn test_top_endpoints_across_clients() {
        let tops = vec![
            ClientTopEndpoint {
                client: "A".to_string(),
                endpoint: PathNormalizer::default().normalize_path("/y"),
                count: 5,
            },
            ClientTopEndpoint {
                client: "B".to_string(),
                endpoint: PathNormalizer::default().normalize_path("/x"),
                count: 2,
            },
            ClientTopEndpoint {
                client: "C".to_string(),
                endpoint: PathNormalizer::default().normalize_path("/x"),
                count: 4,
            },
            ClientTopEndpoint {
                client: "D".to_string(),
                endpoint: PathNormalizer::default().normalize_path("/z"),
                count: 1,
            },
        ];

        let leaders = TrafficAggregator::top_endpoints(&tops, 2);
        assert_eq!(leaders.len(), 2);
        assert_eq!(leaders[0].endpoint, "/x");
        assert_eq!(leaders[0].total, 6);
        assert_eq!(leaders[0].clients[0].client, "C");
        assert_eq!(leaders[1].endpoint, "/y");
    }

    #[test]
    fn test_no_api_traffic_is_empty_not_error() {
        let records = vec![record("A", "GET", "/static/app.js")];
        let aggregator = TrafficAggregator::default();

        let result = aggregator.count_by_verb_and_endpoint(&records);
        assert!(result.rows.is_empty());
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_unforwarded_request_is_still_traffic() {
        let content = "client_ip,request_url,request_verb,request_processing_time,target_processing_time,response_processing_time,time\n\
            A,/api/users/1,GET,0.1,0.2,0.1,2024-01-01T00:00:00Z\n\
            A,/api/users/2,GET,-1,-1,-1,2024-01-01T00:00:01Z\n";

        let loaded = LogReader::from_str(content).unwrap();
        assert!(loaded.skipped.is_empty());

        let aggregator = TrafficAggregator::default();

        let keyword = aggregator.count_by_keyword(&loaded.records, "users").rows;
        assert_eq!(keyword[0].count, 2);

        let counts = aggregator.count_by_verb_and_endpoint(&loaded.records);
        assert_eq!(counts.skipped, 0);
        assert_eq!(counts.rows[0].endpoint, "/users/{id}");
        assert_eq!(counts.rows[0].count, 2);

        let tops = aggregator.top_endpoint_per_client(&loaded.records).rows;
        assert_eq!(tops[0].count, 2);

        // Only the timing statistics leave it out
        let timings = aggregator.processing_time_stats(&loaded.records, false);
        assert_eq!(timings.skipped, 1);
        assert_eq!(timings.rows[0].count, 1);
    }

    #[test]
    fn test_parallel_classify_keeps_input_order() {
        let paths = ["/api/delta", "/api/alpha", "/static/skip", "/api/charlie", "/api/bravo"];
        let records: Vec<LogRecord> = (0..20_000)
            .map(|i| record("A", "GET", paths[i % paths.len()]))
            .collect();

        let aggregator = TrafficAggregator::default();

        let classified = aggregator.classify(&records);
        assert_eq!(classified.rows.len(), 16_000);
        let expected = records
            .iter()
            .filter(|r| !r.request_url.starts_with("/static"));
        for (request, record) in classified.rows.iter().zip(expected) {
            assert!(std::ptr::eq(request.record, record));
        }

        // Every endpoint ties, so first-seen order decides
        let counts = aggregator.count_by_verb_and_endpoint(&records).rows;
        let endpoints: Vec<(&str, usize)> = counts
            .iter()
            .map(|c| (c.endpoint.as_str(), c.count))
            .collect();
        assert_eq!(
            endpoints,
            vec![
                ("/delta", 4000),
                ("/alpha", 4000),
                ("/charlie", 4000),
                ("/bravo", 4000),
            ]
        );

        let tops = aggregator.top_endpoint_per_client(&records).rows;
        assert_eq!(tops[0].endpoint, "/delta");
    }
}
