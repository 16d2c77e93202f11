use cdc_config::load_config;
use cdc_config::shared::RouterConfig;

use crate::error::{RouterError, RouterResult};

/// Loads and validates the router configuration.
pub fn load_router_config() -> RouterResult<RouterConfig> {
    let config = load_config::<RouterConfig>().map_err(RouterError::config)?;
    config.validate().map_err(RouterError::config)?;

    Ok(config)
}
