//! # metrelay-adapters
//!
//! Ready-made [`MetricSource`](metrelay_sdk::MetricSource) implementations
//! for metrelay.
//!
//! ## Supported Systems
//!
//! - **Zabbix** (`zabbix` feature) - Latest item values, trigger states and
//!   trigger availability history via the JSON-RPC API
//! - **Elasticsearch** (`elasticsearch` feature) - JVM heap usage per node
//! - **Carbon intensity** (`carbon-intensity` feature) - National and
//!   regional GB grid carbon intensity
//! - **CloudWatch** (`cloudwatch` feature) - Classic load balancer traffic and
//!   RDS free storage
//!
//! ## Quick Start (Elasticsearch)
//!
//! ```rust,no_run
//! use metrelay_adapters::elasticsearch::ElasticsearchSource;
//! use metrelay_sdk::MetricSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let source = ElasticsearchSource::new("http://localhost:9200")?;
//!
//!     let snapshot = source.poll().await?;
//!
//!     println!("Collected {} metrics", snapshot.len());
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "zabbix")]
pub mod zabbix;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

#[cfg(feature = "carbon-intensity")]
pub mod carbon;

#[cfg(feature = "cloudwatch")]
pub mod cloudwatch;

pub use error::AdapterError;

// Re-export types for convenience
pub use metrelay_types::MetricSnapshot;
