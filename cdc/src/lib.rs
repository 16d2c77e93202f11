//! Routing core for change data capture events.
//!
//! Change envelopes are read from an [`transport::EventSource`], matched against the
//! destinations of a [`schema::TypeRegistry`], transformed into fully populated
//! [`types::DestinationRecord`]s and written to a [`destination::Destination`]. Events that
//! cannot be routed or converted are preserved by a [`dead_letter::DeadLetterSink`].
//!
//! Records carry a version token derived from the ordering token and an `is_deleted` flag, so
//! a destination merging rows by key and keeping the highest version converges to the source
//! state even though delivery is at least once.

pub mod concurrency;
pub mod conversions;
pub mod dead_letter;
pub mod destination;
pub mod error;
mod macros;
pub mod metrics;
pub mod router;
pub mod schema;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transformer;
pub mod transport;
pub mod types;
pub mod workers;
