//! Utilities for testing the routing core.
//!
//! - [`schema`] builds a registry with the sample retail destinations.
//! - [`event`] builds wire envelopes.
//! - [`faulty`] provides destinations and dead letter sinks that fail, stall or block on demand.
//! - [`notify`] waits for asynchronous conditions with a timeout.

pub mod event;
pub mod faulty;
pub mod notify;
pub mod schema;
