//! Per-source scheduling state owned by the relay.

use std::time::Duration;

use tokio::time::Instant;

use crate::source::MetricSource;

/// Shortest interval a source may ask for.
pub(crate) const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A registered source together with the time of its last successful poll.
#[derive(Debug)]
pub(crate) struct SourceSlot {
    pub(crate) source: Box<dyn MetricSource>,
    pub(crate) interval: Duration,
    pub(crate) last_polled: Option<Instant>,
}

impl SourceSlot {
    pub(crate) fn new(source: Box<dyn MetricSource>) -> Self {
        let mut interval = source.poll_interval();
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                source = %source.name(),
                requested = ?interval,
                "Poll interval below minimum, clamping to {:?}",
                MIN_POLL_INTERVAL
            );
            interval = MIN_POLL_INTERVAL;
        }

        Self {
            source,
            interval,
            last_polled: None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.source.name()
    }

    /// A source that has never been polled successfully is always due.
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        match self.last_polled {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record a successful poll. Never moves the clock backwards.
    pub(crate) fn mark_polled(&mut self, now: Instant) {
        self.last_polled = Some(match self.last_polled {
            Some(last) if last > now => last,
            _ => now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use async_trait::async_trait;
    use metrelay_types::MetricSnapshot;

    #[derive(Debug)]
    struct Fixed(Duration);

    #[async_trait]
    impl MetricSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn poll_interval(&self) -> Duration {
            self.0
        }

        async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
            Ok(MetricSnapshot::new())
        }
    }

    fn slot(secs: u64) -> SourceSlot {
        SourceSlot::new(Box::new(Fixed(Duration::from_secs(secs))))
    }

    #[test]
    fn never_polled_is_due() {
        assert!(slot(3600).is_due(Instant::now()));
    }

    #[test]
    fn due_exactly_at_interval() {
        let start = Instant::now();
        let mut slot = slot(60);
        slot.mark_polled(start);

        assert!(!slot.is_due(start));
        assert!(!slot.is_due(start + Duration::from_secs(59)));
        assert!(slot.is_due(start + Duration::from_secs(60)));
        assert!(slot.is_due(start + Duration::from_secs(61)));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let slot = slot(0);
        assert_eq!(slot.interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn last_polled_never_goes_backwards() {
        let start = Instant::now();
        let mut slot = slot(5);
        slot.mark_polled(start + Duration::from_secs(10));
        slot.mark_polled(start);

        assert_eq!(slot.last_polled, Some(start + Duration::from_secs(10)));
    }
}
