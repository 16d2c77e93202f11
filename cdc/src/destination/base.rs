use std::future::Future;

use crate::error::CdcResult;
use crate::types::DestinationRecord;

/// Trait for systems that accept transformed records.
///
/// [`Destination`] implementations are expected to merge rows by their `order_by` key keeping
/// the highest version token, and to expose `is_deleted` rather than physically removing
/// rows. Since the router delivers at least once, writing the same record twice must converge
/// to the same logical row.
///
/// Write failures are returned to the caller, which hands the event back to the transport for
/// redelivery. Implementations must not retry internally without bound.
///
/// The trait also provides an optional [`Destination::shutdown`] method with a default no-op
/// implementation. Override it when buffered output must be flushed on shutdown.
pub trait Destination {
    /// Returns the name of the destination implementation.
    fn name() -> &'static str;

    /// Flushes and releases resources once all workers have stopped.
    fn shutdown(&self) -> impl Future<Output = CdcResult<()>> + Send {
        async { Ok(()) }
    }

    /// Writes a single record to the destination named by [`DestinationRecord::destination`].
    fn write(&self, record: DestinationRecord) -> impl Future<Output = CdcResult<()>> + Send;
}
