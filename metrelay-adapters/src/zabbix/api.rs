//! Minimal Zabbix JSON-RPC client.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use metrelay_types::{EventLogEntry, TriggerState};

use crate::error::{check_status, http_client};
use crate::AdapterError;

const RPC_PATH: &str = "/api_jsonrpc.php";
const RPC_CONTENT_TYPE: &str = "application/json-rpc";

/// Lowest trigger severity reported ("high").
const MIN_TRIGGER_SEVERITY: &str = "4";

/// Client for the Zabbix JSON-RPC API.
#[derive(Debug, Clone)]
pub struct ZabbixClient {
    client: Client,
    url: String,
    username: String,
    password: String,
}

impl ZabbixClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ZabbixClientBuilder {
        ZabbixClientBuilder::default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Log in and return a session token.
    pub async fn login(&self) -> Result<String, AdapterError> {
        let params = json!({
            "username": self.username,
            "password": self.password,
        });
        self.call("user.login", params, None).await.map_err(|e| match e {
            AdapterError::Rpc { message, .. } => AdapterError::Auth(message),
            other => other,
        })
    }

    /// Host id to host name.
    pub async fn hosts(&self, auth: &str) -> Result<HashMap<String, String>, AdapterError> {
        let hosts: Vec<Host> = self
            .call("host.get", json!({ "output": ["hostid", "host"] }), Some(auth))
            .await?;
        Ok(hosts.into_iter().map(|h| (h.hostid, h.host)).collect())
    }

    /// Items, web items included, with the given key on every host.
    pub async fn items_by_key(&self, auth: &str, key: &str) -> Result<Vec<Item>, AdapterError> {
        let params = json!({
            "filter": { "key_": key },
            "output": "extend",
            "webitems": true,
        });
        self.call("item.get", params, Some(auth)).await
    }

    /// Monitored triggers of high severity and above.
    pub async fn triggers(&self, auth: &str) -> Result<Vec<Trigger>, AdapterError> {
        let params = json!({
            "output": "extend",
            "expandDescription": true,
            "monitored": true,
            "min_severity": MIN_TRIGGER_SEVERITY,
        });
        self.call("trigger.get", params, Some(auth)).await
    }

    /// The full event log of one trigger, oldest first.
    pub async fn events(&self, auth: &str, trigger_id: &str) -> Result<Vec<EventLogEntry>, AdapterError> {
        let params = json!({
            "objectids": trigger_id,
            "output": ["clock", "value"],
            "sortfield": ["clock", "eventid"],
            "sortorder": "ASC",
        });
        let events: Vec<Event> = self.call("event.get", params, Some(auth)).await?;
        events.iter().map(Event::to_entry).collect()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        auth: Option<&str>,
    ) -> Result<T, AdapterError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
            auth,
        };

        tracing::debug!(method, url = %self.url, "Zabbix API call");
        let response = self
            .client
            .post(format!("{}{}", self.url, RPC_PATH))
            .header(reqwest::header::CONTENT_TYPE, RPC_CONTENT_TYPE)
            .json(&request)
            .send()
            .await?;

        let body: RpcResponse<T> = check_status(response)?.json().await?;
        body.into_result()
    }
}

/// Builder for [`ZabbixClient`].
#[derive(Debug, Default)]
pub struct ZabbixClientBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
}

impl ZabbixClientBuilder {
    /// Set the frontend URL (e.g., "https://zabbix.local/zabbix").
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the API user's name and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ZabbixClient, AdapterError> {
        let url = self
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AdapterError::Config("Zabbix URL is required".to_string()))?;

        Ok(ZabbixClient {
            client: http_client(self.timeout.unwrap_or(Duration::from_secs(10)))?,
            url: url.trim_end_matches('/').to_string(),
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T, AdapterError> {
        if let Some(error) = self.error {
            let message = match error.data {
                Some(data) if !data.is_empty() => format!("{} {}", error.message, data),
                _ => error.message,
            };
            return Err(AdapterError::Rpc {
                code: error.code,
                message,
            });
        }
        self.result
            .ok_or_else(|| AdapterError::Parse("response has neither result nor error".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Host {
    hostid: String,
    host: String,
}

/// An item as returned by `item.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub hostid: String,
    #[serde(default)]
    pub lastclock: Option<String>,
    #[serde(default)]
    pub lastvalue: Option<String>,
}

/// A trigger as returned by `trigger.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct Trigger {
    pub triggerid: String,
    pub description: String,
    /// "0" when OK, "1" when in problem state.
    pub value: String,
}

impl Trigger {
    pub fn is_active(&self) -> bool {
        self.value != "0"
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    clock: String,
    value: String,
}

impl Event {
    fn to_entry(&self) -> Result<EventLogEntry, AdapterError> {
        let clock: i64 = self
            .clock
            .parse()
            .map_err(|_| AdapterError::Parse(format!("invalid event clock '{}'", self.clock)))?;
        let state: TriggerState = self
            .value
            .parse()
            .map_err(|e| AdapterError::Parse(format!("{e}")))?;
        let timestamp_ms = clock
            .checked_mul(1000)
            .ok_or_else(|| AdapterError::Parse(format!("event clock '{}' out of range", self.clock)))?;
        Ok(EventLogEntry::new(timestamp_ms, state))
    }
}
