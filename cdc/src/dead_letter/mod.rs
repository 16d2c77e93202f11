//! Dead letter handling for events that cannot be delivered to a destination.
//!
//! Malformed envelopes, envelopes for unregistered tables and envelopes whose values cannot be
//! converted are wrapped in a [`DeadLetterRecord`] together with the reason, and captured by a
//! [`DeadLetterSink`] so they can be inspected and replayed once the configuration is fixed.

mod base;
pub mod jsonl;
pub mod memory;
mod record;

pub use base::DeadLetterSink;
pub use record::{DeadLetterPayload, DeadLetterRecord};
