//! Workers turning deliveries into destination records.
//!
//! The [`pool::WorkerPool`] reads from an event source and fans deliveries out to a fixed set
//! of workers. Each worker runs an [`processor::EventProcessor`] per delivery and settles it
//! with the source afterwards.

pub mod pool;
pub mod processor;
