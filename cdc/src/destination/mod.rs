//! Destination abstractions for transformed records.
//!
//! This module provides the [`Destination`] trait and implementations that receive
//! [`crate::types::DestinationRecord`]s. Records carry their destination name, so a single
//! destination implementation serves every registered destination.

mod base;
pub mod jsonl;
pub mod memory;

pub use base::Destination;
