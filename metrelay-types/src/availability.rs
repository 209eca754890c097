//! Availability from a trigger event log.
//!
//! The calculation walks an ascending event log over a half-open window and
//! credits the time between consecutive transitions to the state that was in
//! effect before each transition. The resulting good/bad durations are turned
//! into a percentage by a [`RatioPolicy`].
//!
//! Two behaviours are inherited from the historical implementation and kept
//! behind named, swappable values so that a corrected variant can be checked
//! against recorded output before anything changes:
//!
//! - [`divide_by_good`] computes `100 × (1 − bad / good)`. The denominator is
//!   the good time, not the total, so values can fall outside `[0, 100]`.
//! - [`TailPolicy::Drop`] discards the interval between the last transition
//!   and the end of the window.

use std::fmt;

use crate::{AvailabilityWindow, EventLogEntry, TriggerState};

/// Fixed-point scale of the intermediate ratio (4 decimal places).
const RATIO_SCALE: i128 = 10_000;

/// Time credited to each trigger state within a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Durations {
    pub good_ms: i64,
    pub bad_ms: i64,
    pub unknown_ms: i64,
}

impl Durations {
    /// Credit `delta_ms` to the given state.
    pub fn credit(&mut self, state: TriggerState, delta_ms: i64) {
        match state {
            TriggerState::Good => self.good_ms += delta_ms,
            TriggerState::Bad => self.bad_ms += delta_ms,
            TriggerState::Unknown => self.unknown_ms += delta_ms,
        }
    }

    /// Sum of all three accumulators.
    pub fn total_ms(&self) -> i64 {
        self.good_ms + self.bad_ms + self.unknown_ms
    }
}

/// What to do with the time between the last event and the end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Leave the tail unaccounted. This is the historical behaviour.
    #[default]
    Drop,
    /// Credit the tail to the state in effect after the last event.
    CreditLastState,
}

impl TailPolicy {
    /// Apply the policy once the event log is exhausted.
    ///
    /// `cursor` is the time of the last processed event (or the window start
    /// if there were none) and `state` the state it left in effect.
    pub fn apply(
        self,
        durations: &mut Durations,
        state: TriggerState,
        cursor: i64,
        window: AvailabilityWindow,
    ) {
        match self {
            TailPolicy::Drop => {}
            TailPolicy::CreditLastState => {
                let start = cursor.max(window.from_ms);
                if start < window.to_ms {
                    durations.credit(state, window.to_ms - start);
                }
            }
        }
    }
}

/// Walk `events` over `window`, crediting elapsed time to trigger states.
///
/// Events at or before `window.from_ms` only establish the starting state.
/// Each later event credits `[max(cursor, from), min(event, to))` to the state
/// in effect before it. Walking stops when the log is exhausted or the cursor
/// has reached `window.to_ms`; the remainder is then handed to `tail`.
pub fn accumulate(
    events: &[EventLogEntry],
    window: AvailabilityWindow,
    tail: TailPolicy,
) -> Durations {
    let mut durations = Durations::default();
    let mut cursor = window.from_ms;
    let mut state = TriggerState::Unknown;
    let mut events = events.iter();

    while cursor < window.to_ms {
        let Some(event) = events.next() else {
            tail.apply(&mut durations, state, cursor, window);
            return durations;
        };

        if event.timestamp_ms > window.from_ms {
            let start = cursor.max(window.from_ms);
            let end = event.timestamp_ms.min(window.to_ms);
            durations.credit(state, (end - start).max(0));
        }

        state = event.state;
        cursor = event.timestamp_ms;
    }

    durations
}

/// A percentage with exactly two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percentage {
    hundredths: i64,
}

impl Percentage {
    pub const ZERO: Percentage = Percentage { hundredths: 0 };
    pub const HUNDRED: Percentage = Percentage { hundredths: 10_000 };

    /// Create from a value in hundredths of a percent (`9_995` is `99.95`).
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    pub const fn hundredths(&self) -> i64 {
        self.hundredths
    }

    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }

    /// `100 × (1 − ratio)` for a ratio at 4 decimal places.
    fn complement_of(ratio_scaled: i128) -> Self {
        let hundredths = RATIO_SCALE - ratio_scaled;
        Self {
            hundredths: hundredths.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Turns bad and good durations into a percentage.
pub type RatioPolicy = fn(bad_ms: i64, good_ms: i64) -> Percentage;

/// `numerator / denominator` at 4 decimal places, rounded half-up.
fn scaled_ratio(numerator: i64, denominator: i64) -> i128 {
    let numerator = numerator.max(0) as i128 * RATIO_SCALE;
    let denominator = denominator as i128;
    (2 * numerator + denominator) / (2 * denominator)
}

/// `100 × (1 − bad / good)`, the historical formula.
///
/// With no good time at all the ratio is undefined; the result is then
/// [`Percentage::ZERO`].
pub fn divide_by_good(bad_ms: i64, good_ms: i64) -> Percentage {
    if good_ms <= 0 {
        return Percentage::ZERO;
    }
    Percentage::complement_of(scaled_ratio(bad_ms, good_ms))
}

/// `100 × (1 − bad / (good + bad))`, the conventional uptime formula.
///
/// Returns [`Percentage::ZERO`] when neither state was observed.
pub fn divide_by_total(bad_ms: i64, good_ms: i64) -> Percentage {
    let total = good_ms.max(0) + bad_ms.max(0);
    if total == 0 {
        return Percentage::ZERO;
    }
    Percentage::complement_of(scaled_ratio(bad_ms, total))
}

/// Durations and percentage for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub durations: Durations,
    pub percentage: Percentage,
}

/// Computes availability from event logs.
///
/// The default uses [`divide_by_good`] and [`TailPolicy::Drop`].
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityCalculator {
    ratio: RatioPolicy,
    tail: TailPolicy,
}

impl Default for AvailabilityCalculator {
    fn default() -> Self {
        Self {
            ratio: divide_by_good,
            tail: TailPolicy::Drop,
        }
    }
}

impl AvailabilityCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ratio formula.
    pub fn with_ratio(mut self, ratio: RatioPolicy) -> Self {
        self.ratio = ratio;
        self
    }

    /// Replace the tail handling.
    pub fn with_tail(mut self, tail: TailPolicy) -> Self {
        self.tail = tail;
        self
    }

    pub fn tail(&self) -> TailPolicy {
        self.tail
    }

    /// Availability of `events` over `window`.
    pub fn calculate(&self, events: &[EventLogEntry], window: AvailabilityWindow) -> Availability {
        let durations = accumulate(events, window, self.tail);
        let percentage = (self.ratio)(durations.bad_ms, durations.good_ms);
        Availability {
            durations,
            percentage,
        }
    }
}
