//! Load balancer and RDS metrics from Amazon CloudWatch.
//!
//! ## Metrics Collected
//!
//! Per classic load balancer, for the last minute, hour and day:
//!
//! - `<lb>-RequestCount-<period>`: request count (sum)
//! - `<lb>-HTTPCode_Backend_5XX-<period>`: backend 5xx responses (sum)
//! - `<lb>-Latency-<period>`: average latency in seconds
//! - `<lb>-HTTPCode_Backend_5XX-percentage-<period>`: 5xx responses as a
//!   percentage of requests
//!
//! Per RDS instance: `<db>-FreeStorageSpace-minute`, the average free storage
//! in bytes over the last minute.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::config::{Credentials, Region};
use aws_sdk_cloudwatch::error::{DisplayErrorContext, SdkError};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, StandardUnit, Statistic};
use aws_sdk_cloudwatch::Client;
use chrono::Utc;
use metrelay_sdk::{BoxError, MetricSource};
use metrelay_types::{metric_key, MetricSnapshot};

use crate::AdapterError;

const ELB_NAMESPACE: &str = "AWS/ELB";
const RDS_NAMESPACE: &str = "AWS/RDS";
const LOAD_BALANCER_DIMENSION: &str = "LoadBalancerName";
const DB_INSTANCE_DIMENSION: &str = "DBInstanceIdentifier";

const REQUEST_COUNT: &str = "RequestCount";
const BACKEND_5XX: &str = "HTTPCode_Backend_5XX";
const LATENCY: &str = "Latency";
const FREE_STORAGE_SPACE: &str = "FreeStorageSpace";

/// Build a CloudWatch client.
///
/// Static credentials are used when both key and secret are non-empty;
/// otherwise the default AWS credential chain applies.
pub async fn connect(access_key: &str, access_secret: &str, region: &str) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if !access_key.is_empty() && !access_secret.is_empty() {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            access_secret,
            None,
            None,
            "metrelay",
        ));
    }
    Client::new(&loader.load().await)
}

/// Look-back window of a statistic. The whole window is one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Minute,
    Hour,
    Day,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Minute, Period::Hour, Period::Day];

    pub fn seconds(&self) -> i64 {
        match self {
            Period::Minute => 60,
            Period::Hour => 60 * 60,
            Period::Day => 24 * 60 * 60,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Period::Minute => "minute",
            Period::Hour => "hour",
            Period::Day => "day",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stat {
    Sum,
    Average,
}

impl Stat {
    fn statistic(&self) -> Statistic {
        match self {
            Stat::Sum => Statistic::Sum,
            Stat::Average => Statistic::Average,
        }
    }

    fn pick(&self, datapoint: &Datapoint) -> Option<f64> {
        match self {
            Stat::Sum => datapoint.sum(),
            Stat::Average => datapoint.average(),
        }
    }
}

#[derive(Debug, Clone)]
struct Query {
    namespace: &'static str,
    dimension: &'static str,
    metric: &'static str,
    stat: Stat,
    unit: Option<StandardUnit>,
}

impl Query {
    /// The first datapoint's value over the last `period`, or zero when
    /// CloudWatch has nothing for it.
    async fn fetch(&self, client: &Client, entity: &str, period: Period) -> Result<f64, AdapterError> {
        let end = Utc::now().timestamp();
        let start = end - period.seconds();

        let output = client
            .get_metric_statistics()
            .namespace(self.namespace)
            .metric_name(self.metric)
            .dimensions(Dimension::builder().name(self.dimension).value(entity).build())
            .statistics(self.stat.statistic())
            .set_unit(self.unit.clone())
            .start_time(AwsDateTime::from_secs(start))
            .end_time(AwsDateTime::from_secs(end))
            .period(period.seconds() as i32)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(first_value(output.datapoints(), self.stat))
    }
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> AdapterError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) => AdapterError::Timeout,
        SdkError::DispatchFailure(_) => AdapterError::Connection(DisplayErrorContext(&err).to_string()),
        _ => AdapterError::Http(DisplayErrorContext(&err).to_string()),
    }
}

fn first_value(datapoints: &[Datapoint], stat: Stat) -> f64 {
    datapoints.first().and_then(|d| stat.pick(d)).unwrap_or(0.0)
}

/// Request counts, 5xx counts and latency for classic load balancers.
#[derive(Debug, Clone)]
pub struct LoadBalancerSource {
    client: Client,
    load_balancers: Vec<String>,
    interval: Duration,
}

impl LoadBalancerSource {
    pub fn new(client: Client, load_balancers: Vec<String>) -> Self {
        Self {
            client,
            load_balancers,
            interval: Duration::from_secs(60),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn collect(&self, load_balancer: &str) -> Result<MetricSnapshot, AdapterError> {
        let count = |metric| Query {
            namespace: ELB_NAMESPACE,
            dimension: LOAD_BALANCER_DIMENSION,
            metric,
            stat: Stat::Sum,
            unit: Some(StandardUnit::Count),
        };
        let latency = Query {
            namespace: ELB_NAMESPACE,
            dimension: LOAD_BALANCER_DIMENSION,
            metric: LATENCY,
            stat: Stat::Average,
            unit: Some(StandardUnit::Seconds),
        };

        let mut snapshot = MetricSnapshot::new();
        for period in Period::ALL {
            let requests = count(REQUEST_COUNT).fetch(&self.client, load_balancer, period).await?;
            let errors = count(BACKEND_5XX).fetch(&self.client, load_balancer, period).await?;
            let average = latency.fetch(&self.client, load_balancer, period).await?;
            snapshot.merge(load_balancer_metrics(load_balancer, period, requests, errors, average));
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl MetricSource for LoadBalancerSource {
    fn name(&self) -> &str {
        "cloudwatch-load-balancers"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        let mut snapshot = MetricSnapshot::new();
        for load_balancer in &self.load_balancers {
            snapshot.merge(self.collect(load_balancer).await?);
        }
        Ok(snapshot)
    }
}

/// Free storage space of RDS instances.
#[derive(Debug, Clone)]
pub struct DatabaseSource {
    client: Client,
    databases: Vec<String>,
    interval: Duration,
}

impl DatabaseSource {
    pub fn new(client: Client, databases: Vec<String>) -> Self {
        Self {
            client,
            databases,
            interval: Duration::from_secs(300),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl MetricSource for DatabaseSource {
    fn name(&self) -> &str {
        "cloudwatch-databases"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        let free_space = Query {
            namespace: RDS_NAMESPACE,
            dimension: DB_INSTANCE_DIMENSION,
            metric: FREE_STORAGE_SPACE,
            stat: Stat::Average,
            unit: None,
        };

        let mut snapshot = MetricSnapshot::new();
        for database in &self.databases {
            let average = free_space.fetch(&self.client, database, Period::Minute).await?;
            snapshot.insert(
                metric_key([database.as_str(), FREE_STORAGE_SPACE, Period::Minute.suffix()]),
                format_integer(average),
            );
        }
        Ok(snapshot)
    }
}

/// All metrics of one load balancer for one period.
fn load_balancer_metrics(
    load_balancer: &str,
    period: Period,
    requests: f64,
    errors: f64,
    latency: f64,
) -> MetricSnapshot {
    let suffix = period.suffix();
    let requests = round_count(requests);
    let errors = round_count(errors);

    MetricSnapshot::builder()
        .metric(metric_key([load_balancer, REQUEST_COUNT, suffix]), requests)
        .metric(metric_key([load_balancer, BACKEND_5XX, suffix]), errors)
        .metric(metric_key([load_balancer, LATENCY, suffix]), format_three_places(latency))
        .metric(
            metric_key([load_balancer, BACKEND_5XX, "percentage", suffix]),
            format_three_places(error_percentage(errors, requests)),
        )
        .build()
}

/// `100 * bad / good`: zero without errors, 100 without requests.
pub(crate) fn error_percentage(bad: i64, good: i64) -> f64 {
    if bad == 0 {
        return 0.0;
    }
    if good == 0 {
        return 100.0;
    }
    bad as f64 / good as f64 * 100.0
}

fn round_count(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Whole number, ties to even.
pub(crate) fn format_integer(value: f64) -> String {
    round_count(value).to_string()
}

/// Up to three decimal places, trailing zeros dropped.
pub(crate) fn format_three_places(value: f64) -> String {
    let fixed = format!("{:.3}", (value * 1000.0).round_ties_even() / 1000.0);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods() {
        assert_eq!(Period::Minute.seconds(), 60);
        assert_eq!(Period::Day.seconds(), 86_400);
        assert_eq!(Period::Hour.suffix(), "hour");
    }

    #[test]
    fn percentage_edge_cases() {
        assert_eq!(error_percentage(0, 0), 0.0);
        assert_eq!(error_percentage(0, 500), 0.0);
        assert_eq!(error_percentage(3, 0), 100.0);
        assert_eq!(error_percentage(5, 200), 2.5);
    }

    #[test]
    fn percentage_divides_by_requests_not_total() {
        // 50 errors out of 50 requests is 100%, not 50%.
        assert_eq!(error_percentage(50, 50), 100.0);
        assert_eq!(error_percentage(150, 100), 150.0);
    }

    #[test]
    fn three_place_formatting() {
        assert_eq!(format_three_places(0.0), "0");
        assert_eq!(format_three_places(100.0), "100");
        assert_eq!(format_three_places(2.5), "2.5");
        assert_eq!(format_three_places(0.123456), "0.123");
        assert_eq!(format_three_places(1.0 / 3.0 * 100.0), "33.333");
    }

    #[test]
    fn integer_formatting() {
        assert_eq!(format_integer(0.0), "0");
        assert_eq!(format_integer(1234.4), "1234");
        assert_eq!(format_integer(20_000_000_000.0), "20000000000");
    }

    #[test]
    fn first_datapoint_or_zero() {
        let points = vec![
            Datapoint::builder().sum(12.0).average(3.5).build(),
            Datapoint::builder().sum(99.0).build(),
        ];
        assert_eq!(first_value(&points, Stat::Sum), 12.0);
        assert_eq!(first_value(&points, Stat::Average), 3.5);
        assert_eq!(first_value(&[], Stat::Sum), 0.0);
    }

    #[test]
    fn load_balancer_keys() {
        let metrics = load_balancer_metrics("web-lb", Period::Hour, 400.0, 3.0, 0.0421);

        assert_eq!(metrics.get("web-lb-RequestCount-hour"), Some("400"));
        assert_eq!(metrics.get("web-lb-HTTPCode_Backend_5XX-hour"), Some("3"));
        assert_eq!(metrics.get("web-lb-Latency-hour"), Some("0.042"));
        assert_eq!(metrics.get("web-lb-HTTPCode_Backend_5XX-percentage-hour"), Some("0.75"));
    }

    #[test]
    fn idle_load_balancer_reports_zeros() {
        let metrics = load_balancer_metrics("web-lb", Period::Minute, 0.0, 0.0, 0.0);

        assert_eq!(metrics.get("web-lb-RequestCount-minute"), Some("0"));
        assert_eq!(metrics.get("web-lb-Latency-minute"), Some("0"));
        assert_eq!(metrics.get("web-lb-HTTPCode_Backend_5XX-percentage-minute"), Some("0"));
    }
}
