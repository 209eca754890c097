//! Calendar bucketing of availability.
//!
//! A long range is split into consecutive buckets and the core calculation is
//! re-run for each one against the same event log. All calendar arithmetic is
//! done in UTC.

use chrono::{DateTime, Duration, Months, Utc};

use crate::{metric_key, AvailabilityCalculator, AvailabilityWindow, EventLogEntry, MetricSnapshot};

/// Bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSize {
    /// Exact 24 hour steps, labelled `YYYYMMDD`.
    Day,
    /// Calendar months, labelled `YYYYMM`.
    Month,
}

impl BucketSize {
    fn label(&self, start: &DateTime<Utc>) -> String {
        match self {
            BucketSize::Day => start.format("%Y%m%d").to_string(),
            BucketSize::Month => start.format("%Y%m").to_string(),
        }
    }

    /// Start of the `index`-th bucket after `origin`.
    fn nth_start(&self, origin: DateTime<Utc>, index: u32) -> Option<DateTime<Utc>> {
        match self {
            BucketSize::Day => origin.checked_add_signed(Duration::days(index as i64)),
            BucketSize::Month => origin.checked_add_months(Months::new(index)),
        }
    }
}

/// One bucket of a bucketed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl Bucket {
    pub fn window(&self) -> AvailabilityWindow {
        AvailabilityWindow::new(self.start.timestamp_millis(), self.end.timestamp_millis())
    }
}

/// Split `[from, to)` into buckets.
///
/// A bucket is emitted for every start that lies before `to`; the last bucket
/// keeps its full length even if it runs past `to`.
pub fn buckets(size: BucketSize, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Bucket> {
    let mut out = Vec::new();
    let mut index = 0;
    while let Some(start) = size.nth_start(from, index) {
        if start >= to {
            break;
        }
        let Some(end) = size.nth_start(from, index + 1) else {
            break;
        };
        out.push(Bucket {
            label: size.label(&start),
            start,
            end,
        });
        index += 1;
    }
    out
}

/// Metric key for one bucket: `<trigger>-availability-<bucket label>`.
pub fn availability_key(trigger_label: &str, bucket_label: &str) -> String {
    metric_key([trigger_label, "availability", bucket_label])
}

impl AvailabilityCalculator {
    /// One availability metric per bucket of `[from, to)`.
    ///
    /// `events` is the trigger's full log, fetched once and reused for every
    /// bucket.
    pub fn bucketed(
        &self,
        size: BucketSize,
        trigger_label: &str,
        events: &[EventLogEntry],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MetricSnapshot {
        buckets(size, from, to)
            .into_iter()
            .map(|bucket| {
                let availability = self.calculate(events, bucket.window());
                (
                    availability_key(trigger_label, &bucket.label),
                    availability.percentage.to_string(),
                )
            })
            .collect()
    }

    /// One availability metric per day of `[from, to)`.
    pub fn by_day(
        &self,
        trigger_label: &str,
        events: &[EventLogEntry],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MetricSnapshot {
        self.bucketed(BucketSize::Day, trigger_label, events, from, to)
    }

    /// One availability metric per calendar month of `[from, to)`.
    pub fn by_month(
        &self,
        trigger_label: &str,
        events: &[EventLogEntry],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MetricSnapshot {
        self.bucketed(BucketSize::Month, trigger_label, events, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriggerState;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn one_bucket_per_day() {
        let days = buckets(BucketSize::Day, utc(2024, 3, 1), utc(2024, 4, 1));
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].label, "20240301");
        assert_eq!(days[30].label, "20240331");
        assert_eq!(days[30].end, utc(2024, 4, 1));
    }

    #[test]
    fn one_bucket_per_calendar_month() {
        let months = buckets(BucketSize::Month, utc(2023, 11, 1), utc(2024, 5, 1));
        let labels: Vec<&str> = months.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["202311", "202312", "202401", "202402", "202403", "202404"]);

        // February 2024 is a leap month.
        assert_eq!(months[3].end - months[3].start, Duration::days(29));
    }

    #[test]
    fn partial_last_day_still_gets_a_bucket() {
        let to = utc(2024, 1, 3) + Duration::hours(6);
        let days = buckets(BucketSize::Day, utc(2024, 1, 1), to);
        assert_eq!(days.len(), 3);
        assert_eq!(days[2].end, utc(2024, 1, 4));
    }

    #[test]
    fn empty_range_has_no_buckets() {
        assert!(buckets(BucketSize::Day, utc(2024, 1, 1), utc(2024, 1, 1)).is_empty());
        assert!(buckets(BucketSize::Month, utc(2024, 2, 1), utc(2024, 1, 1)).is_empty());
    }

    #[test]
    fn zero_events_yield_one_entry_per_day() {
        let metrics = AvailabilityCalculator::default().by_day(
            "Web frontend down",
            &[],
            utc(2024, 4, 1),
            utc(2024, 5, 1),
        );

        assert_eq!(metrics.len(), 30);
        assert_eq!(metrics.get("Web frontend down-availability-20240401"), Some("0.00"));
        assert!(metrics.iter().all(|(_, v)| v == "0.00"));
    }

    #[test]
    fn zero_events_yield_one_entry_per_month() {
        let metrics =
            AvailabilityCalculator::default().by_month("13579", &[], utc(2023, 10, 1), utc(2024, 4, 1));

        assert_eq!(metrics.len(), 6);
        assert!(metrics.contains_key("13579-availability-202310"));
        assert!(metrics.contains_key("13579-availability-202403"));
    }

    #[test]
    fn daily_availability_reflects_outage() {
        let day = utc(2024, 6, 2).timestamp_millis();
        let hour = 3_600_000;
        let events = vec![
            EventLogEntry::new(utc(2024, 5, 20).timestamp_millis(), TriggerState::Good),
            EventLogEntry::new(day + 12 * hour, TriggerState::Bad),
            EventLogEntry::new(day + 15 * hour, TriggerState::Good),
            EventLogEntry::new(day + 30 * hour, TriggerState::Good),
        ];

        let metrics =
            AvailabilityCalculator::default().by_day("api", &events, utc(2024, 6, 1), utc(2024, 6, 4));

        // June 1st: good all day, credited by the next transition on June 2nd.
        assert_eq!(metrics.get("api-availability-20240601"), Some("100.00"));
        // June 2nd: 21h good, 3h bad. 1 - 3/21 = 1 - 0.1429
        assert_eq!(metrics.get("api-availability-20240602"), Some("85.71"));
        // June 3rd: 6h good before the final event, the rest dropped.
        assert_eq!(metrics.get("api-availability-20240603"), Some("100.00"));
    }
}
