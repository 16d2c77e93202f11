//! Configuration types shared between the routing core and the router binary.

mod base;
mod destination;
mod io;
mod metrics;
mod redelivery;
mod router;
mod worker;

pub use base::ValidationError;
pub use destination::{DestinationConfig, FieldConfig};
pub use io::IoConfig;
pub use metrics::MetricsConfig;
pub use redelivery::RedeliveryConfig;
pub use router::RouterConfig;
pub use worker::WorkerConfig;
