//! Interfaces to the durable transport that carries change envelopes.
//!
//! An [`EventSource`] hands out [`Delivery`]s. Each delivery is eventually settled through the
//! source's [`Acknowledger`]: acked once its record or dead letter is stored, or nacked so the
//! transport delivers it again. Delivery is therefore at least once.

mod base;
pub mod jsonl;
pub mod memory;
mod tracker;

pub use base::{Acknowledger, Delivery, DeliveryId, EventSource};
pub use tracker::DeliveryTracker;
