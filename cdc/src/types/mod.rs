//! Common types used throughout the router.
//!
//! Change envelopes as they arrive from the transport, ordering tokens, and the typed records
//! delivered to destinations.

mod cell;
mod envelope;
mod lsn;
mod record;

pub use cell::Cell;
pub use envelope::{ChangeEnvelope, Operation, peek_table};
pub use lsn::Lsn;
pub use record::{DestinationRecord, IS_DELETED_FIELD, LSN_FIELD};
