//! Configuration for the change event router.
//!
//! Configuration is layered: `configuration/base.yaml`, then the file of the active
//! [`Environment`], then `CDC_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
