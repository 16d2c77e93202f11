//! Tracing and metrics setup shared by the router binary and tests.

pub mod metrics;
pub mod tracing;

pub use tracing::{init_test_tracing, init_tracing};
