//! Latest item values and trigger states from Zabbix.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrelay_sdk::{BoxError, MetricSource};
use metrelay_types::{metric_key, MetricSnapshot};

use super::api::{Item, Trigger, ZabbixClient};

/// Items whose last value is older than this are not reported.
const STALE_AFTER_SECS: i64 = 10 * 60;

/// Reports `<host>-<item key>` for every fresh item matching the configured
/// keys, plus one `true`/`false` entry per high-severity trigger.
#[derive(Debug)]
pub struct ZabbixMetricsSource {
    client: ZabbixClient,
    item_keys: Vec<String>,
    interval: Duration,
}

impl ZabbixMetricsSource {
    pub fn new(client: ZabbixClient, item_keys: Vec<String>) -> Self {
        Self {
            client,
            item_keys,
            interval: Duration::from_secs(10),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl MetricSource for ZabbixMetricsSource {
    fn name(&self) -> &str {
        "zabbix"
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&self) -> Result<MetricSnapshot, BoxError> {
        let auth = self.client.login().await?;
        let hosts = self.client.hosts(&auth).await?;
        let now_secs = chrono::Utc::now().timestamp();

        let mut snapshot = MetricSnapshot::new();
        for key in &self.item_keys {
            let items = self.client.items_by_key(&auth, key).await?;
            snapshot.merge(item_metrics(&hosts, key, &items, now_secs));
        }

        let triggers = self.client.triggers(&auth).await?;
        snapshot.merge(trigger_metrics(&triggers));
        Ok(snapshot)
    }
}

/// Latest values of items on known hosts updated within the last ten minutes.
pub(crate) fn item_metrics(
    hosts: &HashMap<String, String>,
    key: &str,
    items: &[Item],
    now_secs: i64,
) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::new();
    for item in items {
        let Some(host) = hosts.get(&item.hostid) else {
            continue;
        };
        let Some(clock) = item.lastclock.as_deref().and_then(|c| c.parse::<i64>().ok()) else {
            continue;
        };
        if clock < now_secs - STALE_AFTER_SECS {
            continue;
        }
        if let Some(value) = &item.lastvalue {
            snapshot.insert(metric_key([host.as_str(), key]), value);
        }
    }
    snapshot
}

/// `<description>` = `true` when the trigger is OK, plus summary counts.
pub(crate) fn trigger_metrics(triggers: &[Trigger]) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::new();
    let mut active = 0;
    for trigger in triggers {
        if trigger.is_active() {
            active += 1;
        }
        snapshot.insert(trigger.description.clone(), !trigger.is_active());
    }
    snapshot.insert("numberOfActiveTriggers", active);
    snapshot.insert("activeTriggers", active > 0);
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn hosts() -> HashMap<String, String> {
        HashMap::from([
            ("10084".to_string(), "web-1".to_string()),
            ("10085".to_string(), "db-1".to_string()),
        ])
    }

    fn items() -> Vec<Item> {
        serde_json::from_value(serde_json::json!([
            { "hostid": "10084", "lastclock": (NOW - 30).to_string(), "lastvalue": "0.42" },
            { "hostid": "10085", "lastclock": (NOW - 601).to_string(), "lastvalue": "1.50" },
            { "hostid": "99999", "lastclock": NOW.to_string(), "lastvalue": "7" },
            { "hostid": "10085", "lastvalue": "3" }
        ]))
        .unwrap()
    }

    #[test]
    fn reports_fresh_items_on_known_hosts() {
        let metrics = item_metrics(&hosts(), "system.cpu.load", &items(), NOW);

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics.get("web-1-system.cpu.load"), Some("0.42"));
    }

    #[test]
    fn item_updated_exactly_ten_minutes_ago_is_fresh() {
        let items: Vec<Item> = serde_json::from_value(serde_json::json!([
            { "hostid": "10085", "lastclock": (NOW - 600).to_string(), "lastvalue": "12" }
        ]))
        .unwrap();

        let metrics = item_metrics(&hosts(), "vfs.fs.size", &items, NOW);
        assert_eq!(metrics.get("db-1-vfs.fs.size"), Some("12"));
    }

    #[test]
    fn trigger_states_and_summary() {
        let triggers: Vec<Trigger> = serde_json::from_value(serde_json::json!([
            { "triggerid": "1", "description": "Disk full on db-1", "value": "1" },
            { "triggerid": "2", "description": "web-1 unreachable", "value": "0" }
        ]))
        .unwrap();

        let metrics = trigger_metrics(&triggers);

        assert_eq!(metrics.get("Disk full on db-1"), Some("false"));
        assert_eq!(metrics.get("web-1 unreachable"), Some("true"));
        assert_eq!(metrics.get("numberOfActiveTriggers"), Some("1"));
        assert_eq!(metrics.get("activeTriggers"), Some("true"));
    }

    #[test]
    fn no_triggers_means_nothing_active() {
        let metrics = trigger_metrics(&[]);
        assert_eq!(metrics.get("numberOfActiveTriggers"), Some("0"));
        assert_eq!(metrics.get("activeTriggers"), Some("false"));
    }
}
