use std::future::Future;

use crate::dead_letter::DeadLetterRecord;
use crate::error::CdcResult;

/// Trait for side channels that preserve events which could not be delivered.
///
/// A failed capture is fatal only to the event being captured: the caller logs it, counts it
/// and moves on, so implementations should fail fast instead of blocking.
pub trait DeadLetterSink {
    /// Returns the name of the dead letter sink implementation.
    fn name() -> &'static str;

    /// Flushes and releases resources once all workers have stopped.
    fn shutdown(&self) -> impl Future<Output = CdcResult<()>> + Send {
        async { Ok(()) }
    }

    /// Durably stores one dead letter record.
    fn capture(&self, record: DeadLetterRecord) -> impl Future<Output = CdcResult<()>> + Send;
}
