//! NATS destination: one JSON message per snapshot.

use async_nats::Client;
use metrelay_types::MetricSnapshot;

use crate::error::OutputError;

/// Publishes whole snapshots as JSON objects on a NATS subject.
#[derive(Debug, Clone)]
pub struct NatsOutput {
    client: Client,
    subject: String,
}

impl NatsOutput {
    /// Connect to a NATS server.
    pub async fn connect(url: &str, subject: impl Into<String>) -> Result<Self, OutputError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| OutputError::Nats(e.to_string()))?;

        Ok(Self {
            client,
            subject: subject.into(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub(crate) async fn publish(&self, snapshot: &MetricSnapshot) -> Result<(), OutputError> {
        let json = serde_json::to_vec(snapshot)?;
        self.client
            .publish(self.subject.clone(), json.into())
            .await
            .map_err(|e| OutputError::Nats(e.to_string()))
    }

    pub(crate) async fn close(&self) -> Result<(), OutputError> {
        self.client
            .flush()
            .await
            .map_err(|e| OutputError::Nats(e.to_string()))
    }
}
