//! Handle for a relay running in the background.

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Controls a relay started with [`Relay::start`](crate::Relay::start).
///
/// Dropping the handle also stops the relay, but only [`stop`](Self::stop)
/// waits for destinations to be closed.
#[derive(Debug)]
pub struct RelayHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    pub(crate) fn new(stop_tx: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop_tx, task }
    }

    /// Whether the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait for the current tick and all destination
    /// closes to finish.
    ///
    /// Fails only if the driver task panicked.
    pub async fn stop(self) -> Result<(), JoinError> {
        let _ = self.stop_tx.send(true);
        self.task.await
    }
}
