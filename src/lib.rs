//! # metrelay
//!
//! A relay that polls monitoring systems on independent schedules and pushes
//! each metric snapshot to every configured destination.
//!
//! ```text
//!  ┌──────────────┐      ┌─────────────────────┐      ┌──────────────┐
//!  │ Zabbix       │      │        Relay        │      │ MQTT         │
//!  │ Elasticsearch│─────▶│ tick: poll what is  │─────▶│ NATS         │
//!  │ Carbon       │ poll │ due, fan out result │ push │ File / TCP   │
//!  │ CloudWatch   │      └─────────────────────┘      └──────────────┘
//!  └──────────────┘
//! ```
//!
//! The binary is driven by a TOML file (see [`config`]); [`registry`] turns
//! that file into a [`metrelay_sdk::Relay`]. Embedders who want to wire sources
//! by hand should depend on `metrelay-sdk` and `metrelay-adapters` directly.
//!
//! ## Usage
//!
//! ```bash
//! # Run until ctrl-c
//! metrelay --config metrelay.toml
//!
//! # Poll everything once and exit
//! metrelay --config metrelay.toml --once
//!
//! # Override a secret from the environment
//! METRELAY__SOURCES__ZABBIX__PASSWORD=hunter2 metrelay
//! ```

pub mod config;
pub mod duration;
pub mod registry;

pub use config::RelayConfig;
pub use registry::build_relay;
