use std::sync::Arc;

use tokio::sync::watch;

/// Receiver side of the shutdown channel.
///
/// A change notification means shutdown was requested. A closed channel is treated the same
/// way by callers.
pub type ShutdownRx = watch::Receiver<()>;

/// Transmitter side of the shutdown channel.
///
/// [`ShutdownTx`] is cheap to clone, so it can be handed to signal handlers while the worker
/// pool keeps its own copy.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<()>>);

impl ShutdownTx {
    /// Notifies every subscribed receiver that shutdown was requested.
    ///
    /// Fails when no receiver is alive anymore, for example because all workers already
    /// stopped on their own.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver that observes only future shutdown requests.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a new shutdown channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(Arc::new(tx)), rx)
}
