//! MetricSnapshot - the flat key/value result of one poll.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// The flat result of polling one source once.
///
/// Keys follow the `<entity>-<metricName>[-<suffix>]` convention (see
/// [`metric_key`](crate::metric_key)); values are text, either a decimal
/// number or `"true"`/`"false"`. No numeric type is enforced here.
///
/// Snapshots are created fresh for every poll, handed to every destination,
/// and then dropped.
///
/// # Example
///
/// ```rust
/// use metrelay_types::MetricSnapshot;
///
/// let snapshot = MetricSnapshot::builder()
///     .metric("web-1-requests-minute", "120")
///     .metric("web-1-healthy", true)
///     .build();
///
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.get("web-1-healthy"), Some("true"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MetricSnapshot {
    metrics: BTreeMap<String, String>,
}

impl MetricSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> MetricSnapshotBuilder {
        MetricSnapshotBuilder::new()
    }

    /// Insert or replace a metric, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.metrics.insert(key.into(), value.to_string())
    }

    /// Merge every metric of `other` into this snapshot.
    ///
    /// Keys present in both take the value from `other`.
    pub fn merge(&mut self, other: MetricSnapshot) {
        self.metrics.extend(other.metrics);
    }

    /// Get the value for a metric key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metrics.get(key).map(String::as_str)
    }

    /// Check whether a metric key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.metrics.contains_key(key)
    }

    /// Check if the snapshot has no metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Number of metrics in the snapshot.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Iterate over metrics in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over metric keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for MetricSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for MetricSnapshot {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.metrics.extend(iter);
    }
}

impl IntoIterator for MetricSnapshot {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetricSnapshot {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

impl From<BTreeMap<String, String>> for MetricSnapshot {
    fn from(metrics: BTreeMap<String, String>) -> Self {
        Self { metrics }
    }
}

/// Builder for constructing `MetricSnapshot` instances.
#[derive(Debug, Default)]
pub struct MetricSnapshotBuilder {
    metrics: BTreeMap<String, String>,
}

impl MetricSnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric.
    pub fn metric(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metrics.insert(key.into(), value.to_string());
        self
    }

    /// Add a metric only when a value is present.
    pub fn metric_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.metric(key, value),
            None => self,
        }
    }

    /// Build the snapshot.
    pub fn build(self) -> MetricSnapshot {
        MetricSnapshot {
            metrics: self.metrics,
        }
    }
}
