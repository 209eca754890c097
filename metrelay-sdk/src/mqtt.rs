//! MQTT destination.
//!
//! Every metric in a snapshot becomes its own message on a single topic, with
//! a `key:value` payload. Messages are sent at most once and never retained.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrelay_types::MetricSnapshot;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, QoS, TlsConfiguration, Transport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::OutputError;

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_CLIENT_ID: &str = "metrelay";
const REQUEST_CAPACITY: usize = 64;
/// How long `close` waits for queued messages and the DISCONNECT to go out.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Connection settings for [`MqttOutput`].
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    /// PEM encoded CA certificate. Enables TLS when set.
    pub ca_cert: Option<PathBuf>,
    pub keep_alive: Duration,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            topic: topic.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            ca_cert: None,
            keep_alive: Duration::from_secs(30),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }
}

/// Publishes snapshots to an MQTT broker.
///
/// The client's event loop runs in a background task for the lifetime of the
/// output; it must be created inside a tokio runtime.
pub struct MqttOutput {
    client: AsyncClient,
    topic: String,
    closing: Arc<AtomicBool>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MqttOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttOutput")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl MqttOutput {
    /// Build the client and start driving its event loop.
    ///
    /// Fails only if the CA certificate cannot be read; the broker connection
    /// itself is established lazily and retried by the event loop.
    pub fn connect(config: MqttConfig) -> Result<Self, OutputError> {
        let mut options = MqttOptions::new(config.client_id, config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        if let Some(path) = &config.ca_cert {
            let ca = std::fs::read(path)?;
            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }));
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let closing = Arc::new(AtomicBool::new(false));
        let stopping = closing.clone();
        let event_loop = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) if stopping.load(Ordering::SeqCst) => {
                        debug!(error = %e, "MQTT event loop ended while closing");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "MQTT connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(Self {
            client,
            topic: config.topic,
            closing,
            event_loop: Mutex::new(Some(event_loop)),
        })
    }

    pub(crate) async fn publish(&self, snapshot: &MetricSnapshot) -> Result<(), OutputError> {
        for (key, value) in snapshot {
            self.client
                .publish(&self.topic, QoS::AtMostOnce, false, payload(key, value))
                .await?;
        }
        Ok(())
    }

    /// Queue a DISCONNECT behind any pending publishes and wait for the event
    /// loop to send it, aborting the loop after [`DISCONNECT_GRACE`].
    pub(crate) async fn close(&self) -> Result<(), OutputError> {
        self.closing.store(true, Ordering::SeqCst);
        let result = self.client.disconnect().await;

        if let Some(mut task) = self.event_loop.lock().await.take() {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
                warn!("MQTT disconnect did not complete, dropping connection");
                task.abort();
            }
        }

        result.map_err(Into::into)
    }
}

fn payload(key: &str, value: &str) -> Vec<u8> {
    if value.is_empty() {
        key.as_bytes().to_vec()
    } else {
        format!("{key}:{value}").into_bytes()
    }
}
