//! Concurrency utilities for coordinating workers.
//!
//! The [`shutdown`] module implements a broadcast-based shutdown pattern: a single signal
//! stops the intake of every worker pool subscribed to it, after which workers drain the
//! events they already hold and exit.

pub mod shutdown;
