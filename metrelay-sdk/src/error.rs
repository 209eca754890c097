//! Error types for the relay and its built-in outputs.

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned across the source and destination traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures caught at the relay boundary.
///
/// None of these abort a tick; they are logged and counted in the
/// [`TickReport`](crate::TickReport).
#[derive(Debug, Error)]
pub enum RelayError {
    /// A source failed while polling.
    #[error("source '{name}' failed to poll: {cause}")]
    SourcePoll { name: String, cause: BoxError },

    /// A source did not answer within the call timeout.
    #[error("source '{name}' timed out after {timeout:?}")]
    SourceTimeout { name: String, timeout: Duration },

    /// A source panicked while polling.
    #[error("source '{name}' panicked: {message}")]
    SourcePanic { name: String, message: String },

    /// A destination rejected or failed to send a snapshot.
    #[error("destination '{name}' failed to publish: {cause}")]
    DestinationPublish { name: String, cause: BoxError },

    /// A destination did not accept a snapshot within the call timeout.
    #[error("destination '{name}' timed out after {timeout:?}")]
    DestinationTimeout { name: String, timeout: Duration },

    /// A destination panicked while publishing or closing.
    #[error("destination '{name}' panicked: {message}")]
    DestinationPanic { name: String, message: String },

    /// A destination failed to release its resources on shutdown.
    #[error("destination '{name}' failed to close: {cause}")]
    DestinationClose { name: String, cause: BoxError },
}

/// Errors from the built-in [`Output`](crate::Output) destinations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Writing to a file or socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The receiving side of a channel output is gone.
    #[error("channel receiver dropped")]
    ChannelClosed,

    /// The channel output is at capacity.
    #[error("channel full")]
    ChannelFull,

    /// The MQTT client rejected a publish or disconnect.
    #[cfg(feature = "mqtt")]
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// A NATS publish or flush failed.
    #[cfg(feature = "nats")]
    #[error("NATS error: {0}")]
    Nats(String),
}
