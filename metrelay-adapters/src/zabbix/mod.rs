//! Zabbix sources using the JSON-RPC API.
//!
//! Two sources share one [`ZabbixClient`]:
//!
//! - [`ZabbixMetricsSource`] reports the latest value of configured item keys
//!   and the state of every high-severity trigger
//! - [`ZabbixAvailabilitySource`] replays trigger event logs into daily and
//!   monthly availability percentages
//!
//! ## Example
//!
//! ```rust,no_run
//! use metrelay_adapters::zabbix::{ZabbixClient, ZabbixMetricsSource};
//! use metrelay_sdk::MetricSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = ZabbixClient::builder()
//!         .url("https://zabbix.local/zabbix")
//!         .credentials("api", "secret")
//!         .build()?;
//!
//!     let source = ZabbixMetricsSource::new(client, vec!["system.cpu.load".to_string()]);
//!     let snapshot = source.poll().await?;
//!
//!     for (key, value) in &snapshot {
//!         println!("{key} = {value}");
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod availability;
mod metrics;

pub use api::{Item, Trigger, ZabbixClient, ZabbixClientBuilder};
pub use availability::ZabbixAvailabilitySource;
pub use metrics::ZabbixMetricsSource;
