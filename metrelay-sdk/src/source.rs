//! The metric source capability.

use std::time::Duration;

use async_trait::async_trait;
use metrelay_types::MetricSnapshot;

use crate::error::BoxError;

/// A pluggable provider of metric snapshots.
///
/// Implementations translate some upstream protocol (REST, JSON-RPC, a cloud
/// SDK) into a flat [`MetricSnapshot`]. Each source declares how often it
/// wants to be polled; the [`Relay`](crate::Relay) decides when it is due.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use async_trait::async_trait;
/// use metrelay_sdk::{BoxError, MetricSnapshot, MetricSource};
///
/// #[derive(Debug)]
/// struct Uptime;
///
/// #[async_trait]
/// impl MetricSource for Uptime {
///     fn name(&self) -> &str {
///         "uptime"
///     }
///
///     fn poll_interval(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
///         Ok(MetricSnapshot::builder().metric("host-1-up", true).build())
///     }
/// }
/// ```
#[async_trait]
pub trait MetricSource: Send + Sync + std::fmt::Debug {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Minimum time between two successful polls.
    fn poll_interval(&self) -> Duration;

    /// Fetch a fresh snapshot.
    ///
    /// Fails when the upstream is unreachable, rejects credentials or returns
    /// data that cannot be parsed.
    async fn poll(&self) -> Result<MetricSnapshot, BoxError>;
}
