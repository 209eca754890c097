//! GB grid carbon intensity from the National Grid ESO API.

use std::time::Duration;

use async_trait::async_trait;
use metrelay_sdk::{BoxError, MetricSource};
use metrelay_types::MetricSnapshot;
use reqwest::Client;
use serde_json::Value;

use crate::error::{check_status, http_client};
use crate::AdapterError;

pub const DEFAULT_ENDPOINT: &str = "https://api.carbonintensity.org.uk";

/// South England.
pub const DEFAULT_REGION: u32 = 12;

/// Current national forecast and actual intensity, plus the forecast for one
/// region.
///
/// Emits `carbonintensity.forecast`, `carbonintensity.actual` (only once the
/// half hour has been measured) and `carbonintensity.region<id>.forecast`.
#[derive(Debug, Clone)]
pub struct CarbonIntensitySource {
    client: Client,
    endpoint: String,
    region: u32,
    interval: Duration,
}

impl CarbonIntensitySource {
    pub fn new() -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client(Duration::from_secs(10))?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            region: DEFAULT_REGION,
            interval: Duration::from_secs(300),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_region(mut self, region: u32) -> Self {
        self.region = region;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn fetch(&self, path: &str) -> Result<Value, AdapterError> {
        let url = format!("{}{}", self.endpoint, path);
        tracing::info!(%url, "Fetching carbon intensity");

        let response = check_status(
            self.client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?,
        )?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetricSource for CarbonIntensitySource {
    fn name(&self) -> &str {
        "carbon-intensity"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        let national = self.fetch("/intensity").await?;
        let regional = self
            .fetch(&format!("/regional/regionid/{}", self.region))
            .await?;

        let mut snapshot = national_intensity(&national)?;
        snapshot.merge(regional_intensity(&regional, self.region)?);
        Ok(snapshot)
    }
}

/// `data[0].intensity` of the national endpoint.
pub(crate) fn national_intensity(body: &Value) -> Result<MetricSnapshot, AdapterError> {
    let intensity = body
        .pointer("/data/0/intensity")
        .ok_or_else(|| AdapterError::Parse("missing data[0].intensity".to_string()))?;

    let mut snapshot = MetricSnapshot::new();
    for field in ["forecast", "actual"] {
        if let Some(value) = intensity.get(field).and_then(Value::as_i64) {
            snapshot.insert(format!("carbonintensity.{field}"), value);
        }
    }
    Ok(snapshot)
}

/// `data[0].data[0].intensity.forecast` of the regional endpoint.
pub(crate) fn regional_intensity(body: &Value, region: u32) -> Result<MetricSnapshot, AdapterError> {
    let intensity = body
        .pointer("/data/0/data/0/intensity")
        .ok_or_else(|| AdapterError::Parse("missing data[0].data[0].intensity".to_string()))?;

    let mut snapshot = MetricSnapshot::new();
    if let Some(value) = intensity.get("forecast").and_then(Value::as_i64) {
        snapshot.insert(format!("carbonintensity.region{region}.forecast"), value);
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forecast_without_actual() {
        let body = json!({
            "data": [{
                "from": "2018-01-20T12:00Z",
                "to": "2018-01-20T12:30Z",
                "intensity": { "forecast": 279, "actual": null, "index": "moderate" }
            }]
        });

        let metrics = national_intensity(&body).unwrap();

        assert_eq!(metrics.get("carbonintensity.forecast"), Some("279"));
        assert_eq!(metrics.get("carbonintensity.actual"), None);
    }

    #[test]
    fn actual_included_when_measured() {
        let body = json!({
            "data": [{
                "intensity": { "forecast": 300, "actual": 311, "index": "high" }
            }]
        });

        let metrics = national_intensity(&body).unwrap();

        assert_eq!(metrics.get("carbonintensity.actual"), Some("311"));
    }

    #[test]
    fn fractional_values_are_ignored() {
        let body = json!({ "data": [{ "intensity": { "forecast": 279.5 } }] });
        assert!(national_intensity(&body).unwrap().is_empty());
    }

    #[test]
    fn regional_forecast() {
        let body = json!({
            "data": [{
                "regionid": 12,
                "shortname": "South England",
                "data": [{
                    "from": "2024-06-01T10:00Z",
                    "to": "2024-06-01T10:30Z",
                    "intensity": { "forecast": 142, "index": "moderate" }
                }]
            }]
        });

        let metrics = regional_intensity(&body, 12).unwrap();

        assert_eq!(metrics.get("carbonintensity.region12.forecast"), Some("142"));
    }

    #[test]
    fn empty_data_is_a_parse_error() {
        let body = json!({ "data": [] });
        assert!(matches!(national_intensity(&body), Err(AdapterError::Parse(_))));
        assert!(matches!(regional_intensity(&body, 12), Err(AdapterError::Parse(_))));
    }
}
