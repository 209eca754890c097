//! Trigger event log types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// State of a monitored trigger after a transition.
///
/// Monitoring systems report these as the codes `"0"` (good), `"1"` (bad)
/// and `"2"` (unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TriggerState {
    /// The trigger condition is clear.
    Good,
    /// The trigger condition is firing.
    Bad,
    /// The trigger state could not be evaluated.
    #[default]
    Unknown,
}

impl TriggerState {
    /// The wire code used by the monitoring system.
    pub fn code(&self) -> &'static str {
        match self {
            TriggerState::Good => "0",
            TriggerState::Bad => "1",
            TriggerState::Unknown => "2",
        }
    }
}

/// Error returned when a trigger state code is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised trigger state code: {0:?}")]
pub struct ParseStateError(pub String);

impl FromStr for TriggerState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(TriggerState::Good),
            "1" => Ok(TriggerState::Bad),
            "2" => Ok(TriggerState::Unknown),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerState::Good => "good",
            TriggerState::Bad => "bad",
            TriggerState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One state transition from a trigger's history.
///
/// Logs are ordered by `timestamp_ms` ascending and never modified once
/// fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLogEntry {
    /// Unix timestamp in milliseconds of the transition.
    pub timestamp_ms: i64,
    /// State the trigger moved into.
    pub state: TriggerState,
}

impl EventLogEntry {
    pub fn new(timestamp_ms: i64, state: TriggerState) -> Self {
        Self {
            timestamp_ms,
            state,
        }
    }
}

/// Half-open time range `[from_ms, to_ms)` in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub from_ms: i64,
    pub to_ms: i64,
}

impl AvailabilityWindow {
    pub fn new(from_ms: i64, to_ms: i64) -> Self {
        Self { from_ms, to_ms }
    }

    /// Length of the window in milliseconds (zero if inverted).
    pub fn len_ms(&self) -> i64 {
        (self.to_ms - self.from_ms).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len_ms() == 0
    }
}
