//! The relay: polls due sources and fans their snapshots out to destinations.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use metrelay_types::MetricSnapshot;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::handle::RelayHandle;
use crate::output::MetricsDestination;
use crate::source::MetricSource;
use crate::state::SourceSlot;

const DEFAULT_TICK: Duration = Duration::from_secs(5);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one [`Relay::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sources polled successfully.
    pub polled: usize,
    /// Sources that were due but failed or timed out.
    pub poll_failures: usize,
    /// Successful deliveries, counted per destination per snapshot.
    pub published: usize,
    /// Failed or timed out deliveries.
    pub publish_failures: usize,
}

/// Polls registered sources on their own intervals and pushes every snapshot
/// to every destination.
///
/// The relay is driven by a fixed tick. On each tick every source whose
/// interval has elapsed since its last successful poll is polled, and the
/// resulting snapshot is delivered to all destinations before the next source
/// is considered. Failures are logged and never stop the tick.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use metrelay_sdk::{Output, Relay};
/// # use async_trait::async_trait;
/// # use metrelay_sdk::{BoxError, MetricSnapshot, MetricSource};
/// # #[derive(Debug)]
/// # struct Uptime;
/// # #[async_trait]
/// # impl MetricSource for Uptime {
/// #     fn name(&self) -> &str { "uptime" }
/// #     fn poll_interval(&self) -> Duration { Duration::from_secs(60) }
/// #     async fn poll(&self) -> Result<MetricSnapshot, BoxError> { Ok(MetricSnapshot::new()) }
/// # }
///
/// #[tokio::main]
/// async fn main() {
///     let relay = Relay::builder()
///         .source(Uptime)
///         .destination(Output::file("metrics.json"))
///         .tick(Duration::from_secs(5))
///         .build();
///
///     relay.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
/// }
/// ```
#[derive(Debug)]
pub struct Relay {
    slots: Vec<SourceSlot>,
    destinations: Vec<Box<dyn MetricsDestination>>,
    tick: Duration,
    call_timeout: Option<Duration>,
}

impl Relay {
    /// Create a builder for configuring the relay.
    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Period of the driver started by [`run_until`](Self::run_until).
    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Run one cycle at the current instant.
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now()).await
    }

    /// Run one cycle as if the clock read `now`.
    ///
    /// A source's last-polled time is set to `now` as soon as its poll
    /// succeeds, before any destination sees the snapshot. A failed poll
    /// leaves it untouched so the source is retried on the next tick.
    pub async fn tick_at(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        for slot in self.slots.iter_mut() {
            if !slot.is_due(now) {
                continue;
            }

            debug!(source = %slot.name(), "Polling source");
            let snapshot = match poll_source(slot.source.as_ref(), self.call_timeout).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(source = %slot.name(), error = %e, "Source poll failed");
                    report.poll_failures += 1;
                    continue;
                }
            };
            slot.mark_polled(now);
            report.polled += 1;

            for destination in self.destinations.iter() {
                debug!(
                    source = %slot.name(),
                    destination = %destination.name(),
                    metrics = snapshot.len(),
                    "Publishing snapshot"
                );
                match publish_to(destination.as_ref(), &snapshot, self.call_timeout).await {
                    Ok(()) => report.published += 1,
                    Err(e) => {
                        error!(
                            source = %slot.name(),
                            destination = %destination.name(),
                            error = %e,
                            "Destination publish failed"
                        );
                        report.publish_failures += 1;
                    }
                }
            }
        }

        report
    }

    /// Tick on a fixed period until `shutdown` resolves, then close every
    /// destination.
    ///
    /// A tick that overruns the period delays the next one rather than
    /// bursting to catch up. A tick already in progress when shutdown is
    /// requested runs to completion.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(tick = ?self.tick, "Relay started");

        let mut timer = tokio::time::interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    let report = self.tick().await;
                    debug!(?report, "Tick complete");
                }
            }
        }

        self.close().await;
        info!("Relay stopped");
    }

    /// Start the driver in a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> RelayHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(self.run_until(async move {
            // A dropped handle closes the channel, which also stops the relay.
            let _ = stop_rx.wait_for(|stop| *stop).await;
        }));

        RelayHandle::new(stop_tx, task)
    }

    /// Close every destination, logging failures.
    ///
    /// Returns the number of destinations that failed to close.
    pub async fn close(self) -> usize {
        let mut failures = 0;
        for destination in self.destinations.iter() {
            if let Err(e) = close_destination(destination.as_ref(), self.call_timeout).await {
                error!(destination = %destination.name(), error = %e, "Destination close failed");
                failures += 1;
            }
        }
        failures
    }
}

/// How a guarded call ended without producing a value.
enum Interrupted {
    TimedOut(Duration),
    Panicked(String),
}

/// Await `call`, turning a panic or an elapsed `limit` into [`Interrupted`].
async fn guarded<T>(call: impl Future<Output = T>, limit: Option<Duration>) -> Result<T, Interrupted> {
    let call = AssertUnwindSafe(call).catch_unwind();
    let outcome = match limit {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| Interrupted::TimedOut(timeout))?,
        None => call.await,
    };
    outcome.map_err(|payload| Interrupted::Panicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

async fn poll_source(
    source: &dyn MetricSource,
    limit: Option<Duration>,
) -> Result<MetricSnapshot, RelayError> {
    let name = source.name().to_string();
    match guarded(source.poll(), limit).await {
        Ok(result) => result.map_err(|cause| RelayError::SourcePoll { name, cause }),
        Err(Interrupted::TimedOut(timeout)) => Err(RelayError::SourceTimeout { name, timeout }),
        Err(Interrupted::Panicked(message)) => Err(RelayError::SourcePanic { name, message }),
    }
}

async fn publish_to(
    destination: &dyn MetricsDestination,
    snapshot: &MetricSnapshot,
    limit: Option<Duration>,
) -> Result<(), RelayError> {
    let name = destination.name().to_string();
    match guarded(destination.publish(snapshot), limit).await {
        Ok(result) => result.map_err(|cause| RelayError::DestinationPublish { name, cause }),
        Err(Interrupted::TimedOut(timeout)) => Err(RelayError::DestinationTimeout { name, timeout }),
        Err(Interrupted::Panicked(message)) => Err(RelayError::DestinationPanic { name, message }),
    }
}

async fn close_destination(
    destination: &dyn MetricsDestination,
    limit: Option<Duration>,
) -> Result<(), RelayError> {
    let name = destination.name().to_string();
    match guarded(destination.close(), limit).await {
        Ok(result) => result.map_err(|cause| RelayError::DestinationClose { name, cause }),
        Err(Interrupted::TimedOut(timeout)) => Err(RelayError::DestinationTimeout { name, timeout }),
        Err(Interrupted::Panicked(message)) => Err(RelayError::DestinationPanic { name, message }),
    }
}

/// Builder for configuring a [`Relay`].
#[derive(Debug)]
pub struct RelayBuilder {
    sources: Vec<Box<dyn MetricSource>>,
    destinations: Vec<Box<dyn MetricsDestination>>,
    tick: Option<Duration>,
    call_timeout: Option<Duration>,
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destinations: Vec::new(),
            tick: None,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

impl RelayBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source.
    pub fn source(self, source: impl MetricSource + 'static) -> Self {
        self.boxed_source(Box::new(source))
    }

    pub fn boxed_source(mut self, source: Box<dyn MetricSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Register a destination. Every snapshot goes to every destination.
    pub fn destination(self, destination: impl MetricsDestination + 'static) -> Self {
        self.boxed_destination(Box::new(destination))
    }

    pub fn boxed_destination(mut self, destination: Box<dyn MetricsDestination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Set the driver period.
    ///
    /// Defaults to 5 seconds. A zero period falls back to the default.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Bound every poll, publish and close call.
    ///
    /// Defaults to 30 seconds. A zero timeout falls back to the default.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Let calls run for as long as they take.
    pub fn no_call_timeout(mut self) -> Self {
        self.call_timeout = None;
        self
    }

    /// Build the relay.
    pub fn build(self) -> Relay {
        let slots: Vec<SourceSlot> = self.sources.into_iter().map(SourceSlot::new).collect();

        let source_names: Vec<&str> = slots.iter().map(|s| s.name()).collect();
        let destination_names: Vec<&str> = self.destinations.iter().map(|d| d.name()).collect();
        info!(
            sources = ?source_names,
            destinations = ?destination_names,
            "Relay configured"
        );

        let tick = match self.tick {
            Some(tick) if tick.is_zero() => {
                warn!("Zero tick period requested, using {:?}", DEFAULT_TICK);
                DEFAULT_TICK
            }
            Some(tick) => tick,
            None => DEFAULT_TICK,
        };

        let call_timeout = match self.call_timeout {
            Some(timeout) if timeout.is_zero() => {
                warn!("Zero call timeout requested, using {:?}", DEFAULT_CALL_TIMEOUT);
                Some(DEFAULT_CALL_TIMEOUT)
            }
            other => other,
        };

        Relay {
            slots,
            destinations: self.destinations,
            tick,
            call_timeout,
        }
    }
}
