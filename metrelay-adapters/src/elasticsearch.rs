//! Elasticsearch JVM heap usage per node.
//!
//! Queries `/_nodes/stats?jvm=true` and reports
//! `elasticsearch-<host>-heapUsedPercent` for every node that holds data or
//! can be elected master. Client (coordinating-only) nodes are skipped.

use std::time::Duration;

use async_trait::async_trait;
use metrelay_sdk::{BoxError, MetricSource};
use metrelay_types::{metric_key, MetricSnapshot};
use reqwest::Client;
use serde_json::Value;

use crate::error::{check_status, http_client};
use crate::AdapterError;

const NODE_STATS_PATH: &str = "/_nodes/stats?jvm=true";

/// Heap usage of every non-client node in a cluster.
#[derive(Debug, Clone)]
pub struct ElasticsearchSource {
    client: Client,
    url: String,
    interval: Duration,
}

impl ElasticsearchSource {
    /// Create a source for the cluster at `url`.
    ///
    /// An empty URL yields a source that always reports an empty snapshot.
    pub fn new(url: impl Into<String>) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client(Duration::from_secs(10))?,
            url: url.into().trim_end_matches('/').to_string(),
            interval: Duration::from_secs(10),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn fetch_node_stats(&self) -> Result<Value, AdapterError> {
        let url = format!("{}{}", self.url, NODE_STATS_PATH);
        tracing::debug!(%url, "Fetching node stats");

        let response = check_status(self.client.get(&url).send().await?)?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetricSource for ElasticsearchSource {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        if self.url.is_empty() {
            return Ok(MetricSnapshot::new());
        }
        let stats = self.fetch_node_stats().await?;
        Ok(heap_usage(&stats)?)
    }
}

/// Extract per-node heap usage from a node stats response.
pub(crate) fn heap_usage(stats: &Value) -> Result<MetricSnapshot, AdapterError> {
    let nodes = stats
        .get("nodes")
        .and_then(Value::as_object)
        .ok_or_else(|| AdapterError::Parse("node stats without 'nodes'".to_string()))?;

    let mut snapshot = MetricSnapshot::new();
    for (id, node) in nodes {
        if is_client(node) {
            continue;
        }

        let host = node.get("host").and_then(Value::as_str);
        let heap = node.pointer("/jvm/mem/heap_used_percent");
        match (host, heap) {
            (Some(host), Some(heap)) => {
                snapshot.insert(metric_key(["elasticsearch", host, "heapUsedPercent"]), text(heap));
            }
            _ => tracing::warn!(node = %id, "Node stats missing host or heap usage"),
        }
    }
    Ok(snapshot)
}

/// Older clusters flag client nodes with a `client` attribute; newer ones
/// list roles, and a node with neither master nor data roles only
/// coordinates.
fn is_client(node: &Value) -> bool {
    let flagged = node
        .pointer("/attributes/client")
        .or_else(|| node.get("client"))
        .map(|v| v.as_bool().unwrap_or_else(|| v.as_str() == Some("true")))
        .unwrap_or(false);
    if flagged {
        return true;
    }

    match node.get("roles").and_then(Value::as_array) {
        Some(roles) => !roles
            .iter()
            .filter_map(Value::as_str)
            .any(|role| role == "master" || role.starts_with("data")),
        None => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_heap_per_data_node() {
        let stats = json!({
            "cluster_name": "search",
            "nodes": {
                "a1": {
                    "host": "es-1",
                    "roles": ["master", "data"],
                    "jvm": { "mem": { "heap_used_percent": 63 } }
                },
                "b2": {
                    "host": "es-2",
                    "roles": ["data_hot", "ingest"],
                    "jvm": { "mem": { "heap_used_percent": 41 } }
                },
                "c3": {
                    "host": "es-coord",
                    "roles": [],
                    "jvm": { "mem": { "heap_used_percent": 12 } }
                }
            }
        });

        let metrics = heap_usage(&stats).unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.get("elasticsearch-es-1-heapUsedPercent"), Some("63"));
        assert_eq!(metrics.get("elasticsearch-es-2-heapUsedPercent"), Some("41"));
    }

    #[test]
    fn skips_nodes_with_client_attribute() {
        let stats = json!({
            "nodes": {
                "a1": {
                    "host": "es-1",
                    "attributes": { "client": "true", "data": "false" },
                    "jvm": { "mem": { "heap_used_percent": 20 } }
                },
                "b2": {
                    "host": "es-2",
                    "jvm": { "mem": { "heap_used_percent": 75 } }
                }
            }
        });

        let metrics = heap_usage(&stats).unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics.get("elasticsearch-es-2-heapUsedPercent"), Some("75"));
    }

    #[test]
    fn incomplete_node_is_skipped() {
        let stats = json!({ "nodes": { "a1": { "host": "es-1" } } });
        assert!(heap_usage(&stats).unwrap().is_empty());
    }

    #[test]
    fn missing_nodes_is_a_parse_error() {
        let err = heap_usage(&json!({ "error": "boom" })).unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_url_yields_empty_snapshot() {
        let source = ElasticsearchSource::new("").unwrap();
        assert!(source.poll().await.unwrap().is_empty());
    }
}
