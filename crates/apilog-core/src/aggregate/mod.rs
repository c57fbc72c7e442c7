mod group;
mod params;
mod timing;
mod traffic;

pub use params::query_value;
pub use traffic::{ApiRequest, TrafficAggregator};

pub(crate) use group::{Grouped, RunningStats, count_values};

use crate::normalize::NormalizedEndpoint;
use serde::Serialize;

/// Result rows of an aggregation, plus how many records were dropped as
/// unparsable along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate<T> {
    pub rows: T,
    pub skipped: usize,
}

impl<T> Aggregate<T> {
    pub fn new(rows: T, skipped: usize) -> Self {
        Self { rows, skipped }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        Aggregate {
            rows: f(self.rows),
            skipped: self.skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCount {
    pub client: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointCount {
    pub verb: String,
    pub endpoint: NormalizedEndpoint,
    pub count: usize,
}

/// Endpoint x verb request counts; cells without traffic are 0
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EndpointPivot {
    pub verbs: Vec<String>,
    pub endpoints: Vec<NormalizedEndpoint>,
    /// One row per endpoint, one column per verb
    pub counts: Vec<Vec<usize>>,
}

impl EndpointPivot {
    /// Build the pivot from grouped counts; both axes are sorted
    pub fn from_counts(counts: &[EndpointCount]) -> Self {
        let mut verbs: Vec<String> = counts.iter().map(|c| c.verb.clone()).collect();
        verbs.sort();
        verbs.dedup();

        let mut endpoints: Vec<NormalizedEndpoint> =
            counts.iter().map(|c| c.endpoint.clone()).collect();
        endpoints.sort();
        endpoints.dedup();

        let mut matrix = vec![vec![0; verbs.len()]; endpoints.len()];
        for c in counts {
            // Both searches succeed, the axes were built from `counts`
            if let (Ok(row), Ok(col)) = (
                endpoints.binary_search(&c.endpoint),
                verbs.binary_search(&c.verb),
            ) {
                matrix[row][col] += c.count;
            }
        }

        Self {
            verbs,
            endpoints,
            counts: matrix,
        }
    }

    pub fn get(&self, endpoint: &str, verb: &str) -> usize {
        let row = self.endpoints.iter().position(|e| e.as_str() == endpoint);
        let col = self.verbs.iter().position(|v| v == verb);
        match (row, col) {
            (Some(row), Some(col)) => self.counts[row][col],
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientTopEndpoint {
    pub client: String,
    pub endpoint: NormalizedEndpoint,
    pub count: usize,
}

/// An endpoint ranked by how many requests its top clients sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointLeader {
    pub endpoint: NormalizedEndpoint,
    pub total: usize,
    pub clients: Vec<ClientCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingStats {
    pub verb: String,
    pub endpoint: NormalizedEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub count: usize,
    pub mean: f64,
    /// Sample variance; `None` for single-request groups
    pub variance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterValueCount {
    /// `None` collects requests without the parameter
    pub value: Option<String>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PathNormalizer;

    fn endpoint(path: &str) -> NormalizedEndpoint {
        PathNormalizer::default().normalize_path(path)
    }

    #[test]
    fn test_pivot_fills_missing_cells() {
        let counts = vec![
            EndpointCount {
                verb: "GET".to_string(),
                endpoint: endpoint("/users"),
                count: 4,
            },
            EndpointCount {
                verb: "POST".to_string(),
                endpoint: endpoint("/orders"),
                count: 2,
            },
            EndpointCount {
                verb: "GET".to_string(),
                endpoint: endpoint("/orders"),
                count: 1,
            },
        ];

        let pivot = EndpointPivot::from_counts(&counts);
        assert_eq!(pivot.verbs, vec!["GET", "POST"]);
        assert_eq!(pivot.endpoints, vec![endpoint("/orders"), endpoint("/users")]);
        assert_eq!(pivot.counts, vec![vec![1, 2], vec![4, 0]]);
        assert_eq!(pivot.get("/users", "POST"), 0);
        assert_eq!(pivot.get("/users", "GET"), 4);
        assert_eq!(pivot.get("/missing", "GET"), 0);
    }

    #[test]
    fn test_aggregate_map_keeps_skipped() {
        let aggregate = Aggregate::new(vec![1, 2, 3], 2).map(|rows| rows.len());
        assert_eq!(aggregate, Aggregate::new(3, 2));
    }
}
