//! Change event router binary.
//!
//! Reads newline delimited change envelopes from a file or standard input, routes them to one
//! JSON lines file per destination and diverts unroutable events to a dead letter file.

use std::process::ExitCode;

use cdc_config::Environment;
use cdc_config::shared::RouterConfig;
use cdc_telemetry::init_tracing;
use cdc_telemetry::metrics::init_metrics;
use tracing::error;

use crate::config::load_router_config;
use crate::core::start_router_with_config;
use crate::error::{RouterError, RouterResult};

mod config;
mod core;
mod error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, initializes telemetry and runs the router on a multi-threaded runtime.
fn run() -> RouterResult<()> {
    let environment = Environment::load().map_err(RouterError::config)?;
    let router_config = load_router_config()?;

    init_tracing(env!("CARGO_BIN_NAME"), environment).map_err(RouterError::config)?;

    if let Some(metrics) = &router_config.metrics {
        init_metrics(metrics.listen_address).map_err(RouterError::config)?;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(router_config))
}

async fn async_main(router_config: RouterConfig) -> RouterResult<()> {
    if let Err(err) = start_router_with_config(router_config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
