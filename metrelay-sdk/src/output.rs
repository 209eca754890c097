//! Destinations for polled snapshots.

use std::path::PathBuf;

use async_trait::async_trait;
use metrelay_types::MetricSnapshot;
use tokio::sync::mpsc;

use crate::error::{BoxError, OutputError};

#[cfg(feature = "mqtt")]
use crate::mqtt::MqttOutput;

#[cfg(feature = "nats")]
use crate::nats::NatsOutput;

/// A pluggable sink for metric snapshots.
///
/// Delivery is best effort and at most once. A destination must accept
/// repeated publishes with disjoint or overlapping metric sets.
#[async_trait]
pub trait MetricsDestination: Send + Sync + std::fmt::Debug {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Deliver one snapshot.
    async fn publish(&self, snapshot: &MetricSnapshot) -> Result<(), BoxError>;

    /// Release held connections. Called once when the relay shuts down.
    async fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Built-in destinations.
#[derive(Debug)]
pub enum Output {
    /// Write the latest snapshot to a JSON file.
    ///
    /// The file is overwritten on every publish.
    File(PathBuf),

    /// Send each snapshot to a TCP server as one line of JSON.
    ///
    /// A new connection is made for every publish.
    Tcp(String),

    /// Hand snapshots to an in-process receiver.
    ///
    /// Use [`Output::channel`] to create this variant.
    Channel(mpsc::Sender<MetricSnapshot>),

    /// Publish one MQTT message per metric.
    #[cfg(feature = "mqtt")]
    Mqtt(MqttOutput),

    /// Publish the whole snapshot as JSON on a NATS subject.
    #[cfg(feature = "nats")]
    Nats(NatsOutput),
}

impl Output {
    /// Create a file output.
    ///
    /// ```rust
    /// use metrelay_sdk::Output;
    ///
    /// let output = Output::file("latest-metrics.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and the receiver.
    ///
    /// ```rust
    /// use metrelay_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<MetricSnapshot>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    async fn emit(&self, snapshot: &MetricSnapshot) -> Result<(), OutputError> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(snapshot)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Tcp(addr) => {
                use tokio::io::AsyncWriteExt;
                use tokio::net::TcpStream;

                let mut line = serde_json::to_vec(snapshot)?;
                line.push(b'\n');
                let mut stream = TcpStream::connect(addr).await?;
                stream.write_all(&line).await?;
                stream.flush().await?;
            }
            Output::Channel(tx) => {
                tx.try_send(snapshot.clone()).map_err(|e| match e {
                    mpsc::error::TrySendError::Full(_) => OutputError::ChannelFull,
                    mpsc::error::TrySendError::Closed(_) => OutputError::ChannelClosed,
                })?;
            }
            #[cfg(feature = "mqtt")]
            Output::Mqtt(mqtt) => mqtt.publish(snapshot).await?,
            #[cfg(feature = "nats")]
            Output::Nats(nats) => nats.publish(snapshot).await?,
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsDestination for Output {
    fn name(&self) -> &str {
        match self {
            Output::File(_) => "file",
            Output::Tcp(_) => "tcp",
            Output::Channel(_) => "channel",
            #[cfg(feature = "mqtt")]
            Output::Mqtt(_) => "mqtt",
            #[cfg(feature = "nats")]
            Output::Nats(_) => "nats",
        }
    }

    async fn publish(&self, snapshot: &MetricSnapshot) -> Result<(), BoxError> {
        self.emit(snapshot).await.map_err(Into::into)
    }

    async fn close(&self) -> Result<(), BoxError> {
        match self {
            #[cfg(feature = "mqtt")]
            Output::Mqtt(mqtt) => mqtt.close().await.map_err(Into::into),
            #[cfg(feature = "nats")]
            Output::Nats(nats) => nats.close().await.map_err(Into::into),
            _ => Ok(()),
        }
    }
}
