//! # metrelay-types
//!
//! Core types for metrelay. This crate defines the flat metric snapshot that
//! every source produces and every destination consumes, plus the pure
//! arithmetic used to turn a trigger's state-transition log into availability
//! percentages.
//!
//! ## Design Goals
//!
//! - **No I/O**: everything here is plain data and pure functions
//! - **Exact arithmetic**: availability percentages are fixed-point decimals,
//!   never floats
//! - **Swappable policies**: the ratio formula and tail handling are named
//!   values that can be replaced and validated against historical output
//!
//! ## Features
//!
//! - `serde`: JSON serialization of snapshots and event log entries
//!
//! ## Example
//!
//! ```rust
//! use metrelay_types::{
//!     AvailabilityCalculator, AvailabilityWindow, EventLogEntry, TriggerState,
//! };
//!
//! let events = vec![
//!     EventLogEntry::new(1_000, TriggerState::Good),
//!     EventLogEntry::new(5_000, TriggerState::Bad),
//!     EventLogEntry::new(6_000, TriggerState::Good),
//! ];
//!
//! let result = AvailabilityCalculator::default()
//!     .calculate(&events, AvailabilityWindow::new(0, 10_000));
//!
//! assert_eq!(result.durations.good_ms, 4_000);
//! assert_eq!(result.durations.bad_ms, 1_000);
//! assert_eq!(result.percentage.to_string(), "75.00");
//! ```

mod availability;
mod buckets;
mod event;
mod key;
mod snapshot;

pub use availability::*;
pub use buckets::*;
pub use event::*;
pub use key::*;
pub use snapshot::*;
