//! Daily and monthly availability of Zabbix triggers.
//!
//! For every configured trigger the full event log is fetched once and
//! replayed over two ranges:
//!
//! - one bucket per day for the month up to today's midnight (UTC)
//! - one bucket per calendar month for the six months up to the first of the
//!   current month
//!
//! Keys look like `<trigger description>-availability-20240601` and
//! `<trigger description>-availability-202406`. Triggers that Zabbix does not
//! report as monitored fall back to their raw id.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Months, NaiveTime, TimeZone, Utc};
use metrelay_sdk::{BoxError, MetricSource};
use metrelay_types::{AvailabilityCalculator, EventLogEntry, MetricSnapshot};
use tracing::{error, info};

use super::api::ZabbixClient;

const DAY_RANGE_MONTHS: u32 = 1;
const MONTH_RANGE_MONTHS: u32 = 6;

/// Historical availability percentages for a set of triggers.
#[derive(Debug)]
pub struct ZabbixAvailabilitySource {
    client: ZabbixClient,
    trigger_ids: Vec<String>,
    calculator: AvailabilityCalculator,
    interval: Duration,
}

impl ZabbixAvailabilitySource {
    pub fn new(client: ZabbixClient, trigger_ids: Vec<String>) -> Self {
        Self {
            client,
            trigger_ids,
            calculator: AvailabilityCalculator::default(),
            interval: Duration::from_secs(3600),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_calculator(mut self, calculator: AvailabilityCalculator) -> Self {
        self.calculator = calculator;
        self
    }
}

#[async_trait]
impl MetricSource for ZabbixAvailabilitySource {
    fn name(&self) -> &str {
        "zabbix-availability"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        let auth = self.client.login().await?;
        let labels: HashMap<String, String> = self
            .client
            .triggers(&auth)
            .await?
            .into_iter()
            .map(|t| (t.triggerid, t.description))
            .collect();

        let now = Utc::now();
        let mut snapshot = MetricSnapshot::new();
        for trigger_id in &self.trigger_ids {
            info!(trigger = %trigger_id, "Fetching event log");
            let events = match self.client.events(&auth, trigger_id).await {
                Ok(events) => events,
                Err(e) => {
                    error!(trigger = %trigger_id, error = %e, "Failed to fetch event log");
                    continue;
                }
            };

            let label = labels.get(trigger_id).map(String::as_str).unwrap_or(trigger_id.as_str());
            match trigger_metrics(&self.calculator, label, &events, now) {
                Some(metrics) => snapshot.merge(metrics),
                None => error!(trigger = %trigger_id, %now, "Availability ranges out of bounds"),
            }
        }

        Ok(snapshot)
    }
}

/// Day and month metrics for one trigger as of `now`.
pub(crate) fn trigger_metrics(
    calculator: &AvailabilityCalculator,
    label: &str,
    events: &[EventLogEntry],
    now: DateTime<Utc>,
) -> Option<MetricSnapshot> {
    let (day_from, day_to) = day_range(now)?;
    let (month_from, month_to) = month_range(now)?;

    let mut metrics = calculator.by_day(label, events, day_from, day_to);
    metrics.merge(calculator.by_month(label, events, month_from, month_to));
    Some(metrics)
}

/// The month ending at today's midnight.
pub(crate) fn day_range(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let to = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    let from = to.checked_sub_months(Months::new(DAY_RANGE_MONTHS))?;
    Some((from, to))
}

/// The six calendar months ending at the first of the current month.
pub(crate) fn month_range(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let to = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()?;
    let from = to.checked_sub_months(Months::new(MONTH_RANGE_MONTHS))?;
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrelay_types::TriggerState;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_range_covers_the_previous_month() {
        let (from, to) = day_range(utc(2024, 3, 15, 13)).unwrap();
        assert_eq!(from, utc(2024, 2, 15, 0));
        assert_eq!(to, utc(2024, 3, 15, 0));
    }

    #[test]
    fn month_range_covers_six_whole_months() {
        let (from, to) = month_range(utc(2024, 3, 15, 13)).unwrap();
        assert_eq!(from, utc(2023, 9, 1, 0));
        assert_eq!(to, utc(2024, 3, 1, 0));
    }

    #[test]
    fn one_metric_per_day_and_month() {
        let metrics = trigger_metrics(
            &AvailabilityCalculator::default(),
            "Web frontend down",
            &[],
            utc(2024, 3, 15, 13),
        )
        .unwrap();

        // 29 days from Feb 15th (leap year) plus six months.
        assert_eq!(metrics.len(), 29 + 6);
        assert!(metrics.contains_key("Web frontend down-availability-20240215"));
        assert!(metrics.contains_key("Web frontend down-availability-20240314"));
        assert!(metrics.contains_key("Web frontend down-availability-202309"));
        assert!(metrics.contains_key("Web frontend down-availability-202402"));
        assert!(!metrics.contains_key("Web frontend down-availability-202403"));
    }

    #[test]
    fn events_are_replayed_for_both_ranges() {
        let hour = 3_600_000;
        let march_10 = utc(2024, 3, 10, 0).timestamp_millis();
        let events = vec![
            EventLogEntry::new(utc(2023, 8, 1, 0).timestamp_millis(), TriggerState::Good),
            EventLogEntry::new(march_10 + 6 * hour, TriggerState::Bad),
            EventLogEntry::new(march_10 + 9 * hour, TriggerState::Good),
            EventLogEntry::new(utc(2024, 3, 15, 12).timestamp_millis(), TriggerState::Good),
        ];

        let metrics = trigger_metrics(
            &AvailabilityCalculator::default(),
            "13579",
            &events,
            utc(2024, 3, 15, 13),
        )
        .unwrap();

        assert_eq!(metrics.get("13579-availability-20240309"), Some("100.00"));
        // 21h good and 3h bad: 100 * (1 - 0.1429)
        assert_eq!(metrics.get("13579-availability-20240310"), Some("85.71"));
        assert_eq!(metrics.get("13579-availability-202312"), Some("100.00"));
    }
}
