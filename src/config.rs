//! Relay configuration.
//!
//! Read once at startup from a TOML file, with `METRELAY__`-prefixed
//! environment variables layered on top (`METRELAY__TICK=10s`,
//! `METRELAY__SOURCES__ZABBIX__PASSWORD=...`).
//!
//! ```toml
//! tick = "5s"
//!
//! [sources.zabbix]
//! url = "https://zabbix.local/zabbix"
//! username = "api"
//! password = "secret"
//! metrics = ["system.cpu.load"]
//!
//! [destinations.mqtt]
//! host = "broker.local"
//! topic = "metrics"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::duration;

const ENV_PREFIX: &str = "METRELAY";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Driver period.
    #[serde(default = "default_tick", deserialize_with = "duration::deserialize")]
    pub tick: Duration,

    /// Upper bound on every poll and publish.
    #[serde(default = "default_call_timeout", deserialize_with = "duration::deserialize")]
    pub call_timeout: Duration,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub destinations: DestinationsConfig,
}

impl RelayConfig {
    /// Load from a TOML file plus the environment.
    pub fn load(path: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    /// Parse TOML text without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .context("invalid configuration")
    }
}

fn default_tick() -> Duration {
    Duration::from_secs(5)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    pub zabbix: Option<ZabbixConfig>,
    pub zabbix_availability: Option<ZabbixAvailabilityConfig>,
    pub elasticsearch: Option<ElasticsearchConfig>,
    pub carbon_intensity: Option<CarbonIntensityConfig>,
    pub cloudwatch: Option<CloudWatchConfig>,
}

impl SourcesConfig {
    pub fn is_empty(&self) -> bool {
        self.zabbix.is_none()
            && self.zabbix_availability.is_none()
            && self.elasticsearch.is_none()
            && self.carbon_intensity.is_none()
            && self.cloudwatch.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZabbixConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Item keys to report.
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default = "secs::<10>", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZabbixAvailabilityConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub triggers: Vec<String>,
    #[serde(default = "secs::<3600>", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchConfig {
    pub url: String,
    #[serde(default = "secs::<10>", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarbonIntensityConfig {
    #[serde(default = "default_carbon_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_carbon_region")]
    pub region: u32,
    #[serde(default = "secs::<300>", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
}

fn default_carbon_endpoint() -> String {
    "https://api.carbonintensity.org.uk".to_string()
}

fn default_carbon_region() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudWatchConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub access_secret: String,
    pub region: String,
    #[serde(default)]
    pub load_balancers: Vec<String>,
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default = "secs::<60>", deserialize_with = "duration::deserialize")]
    pub load_balancer_interval: Duration,
    #[serde(default = "secs::<300>", deserialize_with = "duration::deserialize")]
    pub database_interval: Duration,
}

fn secs<const N: u64>() -> Duration {
    Duration::from_secs(N)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestinationsConfig {
    pub mqtt: Option<MqttDestinationConfig>,
    pub nats: Option<NatsDestinationConfig>,
    pub file: Option<FileDestinationConfig>,
    pub tcp: Option<TcpDestinationConfig>,
}

impl DestinationsConfig {
    pub fn is_empty(&self) -> bool {
        self.mqtt.is_none() && self.nats.is_none() && self.file.is_none() && self.tcp.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttDestinationConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub topic: String,
    /// PEM CA certificate; enables TLS.
    pub ca_cert: Option<PathBuf>,
    pub client_id: Option<String>,
}

fn default_mqtt_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsDestinationConfig {
    pub url: String,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDestinationConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcpDestinationConfig {
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply() {
        let config = RelayConfig::from_toml(
            r#"
            [sources.elasticsearch]
            url = "http://localhost:9200"

            [sources.carbon_intensity]
            region = 12

            [destinations.file]
            path = "metrics.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.tick, Duration::from_secs(5));
        assert_eq!(config.call_timeout, Duration::from_secs(30));

        let es = config.sources.elasticsearch.unwrap();
        assert_eq!(es.interval, Duration::from_secs(10));

        let carbon = config.sources.carbon_intensity.unwrap();
        assert_eq!(carbon.endpoint, "https://api.carbonintensity.org.uk");
        assert_eq!(carbon.region, 12);
        assert_eq!(carbon.interval, Duration::from_secs(300));

        assert!(config.sources.zabbix.is_none());
        assert_eq!(config.destinations.file.unwrap().path, PathBuf::from("metrics.json"));
    }

    #[test]
    fn full_configuration() {
        let config = RelayConfig::from_toml(
            r#"
            tick = "1s"
            call_timeout = "10s"

            [sources.zabbix]
            url = "https://zabbix.local/zabbix"
            username = "api"
            password = "secret"
            metrics = ["system.cpu.load", "vfs.fs.size[/,pfree]"]

            [sources.zabbix_availability]
            url = "https://zabbix.local/zabbix"
            username = "api"
            password = "secret"
            triggers = ["13579", "24680"]
            interval = "2h"

            [sources.cloudwatch]
            region = "eu-west-1"
            load_balancers = ["web-lb"]
            databases = ["db-1"]

            [destinations.mqtt]
            host = "broker.local"
            port = 8883
            topic = "metrics"
            ca_cert = "/etc/ssl/ca.pem"

            [destinations.tcp]
            addr = "127.0.0.1:9090"
            "#,
        )
        .unwrap();

        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.call_timeout, Duration::from_secs(10));

        let zabbix = config.sources.zabbix.unwrap();
        assert_eq!(zabbix.metrics.len(), 2);
        assert_eq!(zabbix.interval, Duration::from_secs(10));

        let availability = config.sources.zabbix_availability.unwrap();
        assert_eq!(availability.triggers, vec!["13579", "24680"]);
        assert_eq!(availability.interval, Duration::from_secs(7200));

        let cloudwatch = config.sources.cloudwatch.unwrap();
        assert!(cloudwatch.access_key.is_empty());
        assert_eq!(cloudwatch.load_balancer_interval, Duration::from_secs(60));
        assert_eq!(cloudwatch.database_interval, Duration::from_secs(300));

        let mqtt = config.destinations.mqtt.unwrap();
        assert_eq!(mqtt.port, 8883);
        assert_eq!(mqtt.ca_cert, Some(PathBuf::from("/etc/ssl/ca.pem")));
        assert!(mqtt.client_id.is_none());
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = RelayConfig::from_toml(r#"tick = "soon""#).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown duration format"));
    }

    #[test]
    fn empty_sections() {
        let config = RelayConfig::from_toml("").unwrap();
        assert!(config.sources.is_empty());
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "tick = \"15s\"\n[destinations.tcp]\naddr = \"localhost:9090\"").unwrap();

        let config = RelayConfig::load(file.path()).unwrap();

        assert_eq!(config.tick, Duration::from_secs(15));
        assert_eq!(config.destinations.tcp.unwrap().addr, "localhost:9090");
    }

    #[test]
    fn load_fails_for_missing_file() {
        assert!(RelayConfig::load(Path::new("/nonexistent/metrelay.toml")).is_err());
    }
}
