//! # metrelay-sdk
//!
//! Polling engine for metrelay.
//!
//! A [`Relay`] owns a set of [`MetricSource`]s, each with its own poll
//! interval, and a set of [`MetricsDestination`]s. A fixed-period driver
//! checks which sources are due, polls them one at a time and pushes every
//! snapshot to every destination.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use metrelay_sdk::{BoxError, MetricSnapshot, MetricSource, Output, Relay};
//!
//! #[derive(Debug)]
//! struct QueueDepth;
//!
//! #[async_trait]
//! impl MetricSource for QueueDepth {
//!     fn name(&self) -> &str {
//!         "queue-depth"
//!     }
//!
//!     fn poll_interval(&self) -> Duration {
//!         Duration::from_secs(60)
//!     }
//!
//!     async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
//!         Ok(MetricSnapshot::builder().metric("orders-depth", 12).build())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = Relay::builder()
//!         .source(QueueDepth)
//!         .destination(Output::file("metrics.json"))
//!         .build()
//!         .start();
//!
//!     // ... your application runs ...
//!
//!     handle.stop().await.unwrap();
//! }
//! ```
//!
//! ## Features
//!
//! - **Independent intervals**: every source is polled on its own schedule
//! - **Failure isolation**: a failing source or destination never stops a tick
//! - **Built-in outputs**: file, TCP and channel, plus MQTT and NATS behind
//!   the `mqtt` and `nats` features

mod error;
mod handle;
mod output;
mod relay;
mod source;
mod state;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::{BoxError, OutputError, RelayError};
pub use handle::RelayHandle;
pub use output::{MetricsDestination, Output};
pub use relay::{Relay, RelayBuilder, TickReport};
pub use source::MetricSource;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttOutput};

#[cfg(feature = "nats")]
pub use nats::NatsOutput;

// Re-export types for convenience
pub use metrelay_types::{metric_key, MetricSnapshot};
