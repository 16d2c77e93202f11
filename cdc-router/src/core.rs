use std::sync::Arc;

use cdc::dead_letter::jsonl::JsonLinesDeadLetterSink;
use cdc::destination::jsonl::JsonLinesDestination;
use cdc::router::DestinationRouter;
use cdc::schema::TypeRegistry;
use cdc::transformer::Transformer;
use cdc::transport::jsonl::JsonLinesSource;
use cdc::workers::pool::WorkerPool;
use cdc_config::shared::RouterConfig;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

use crate::error::RouterResult;

/// Builds the registry, sinks and source from `router_config` and runs the worker pool until
/// the input is exhausted or a shutdown signal arrives.
pub async fn start_router_with_config(router_config: RouterConfig) -> RouterResult<()> {
    info!("starting router service");

    log_config(&router_config);

    let registry = TypeRegistry::from_config(&router_config.destinations)?;
    let transformer = Transformer::new(DestinationRouter::new(Arc::new(registry)));

    let destination = JsonLinesDestination::new(&router_config.io.output_dir).await?;
    let dead_letters = JsonLinesDeadLetterSink::new(&router_config.io.dead_letter_path);

    let source = match &router_config.io.input_path {
        Some(input_path) => JsonLinesSource::open(input_path).await?,
        None => {
            info!("reading change envelopes from standard input");
            JsonLinesSource::stdin()
        }
    }
    .with_redelivery(router_config.redelivery.clone());

    let pool = WorkerPool::start(
        &router_config.workers,
        transformer,
        source,
        destination,
        dead_letters,
    );

    let shutdown_tx = pool.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!(error = %err, "failed to register sigterm handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, shutting down router");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down router");
            }
        }

        if let Err(err) = shutdown_tx.shutdown() {
            warn!(error = ?err, "failed to send shutdown signal");
        }
    });

    let result = pool.wait().await;

    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result?;

    info!("router stopped");

    Ok(())
}

fn log_config(config: &RouterConfig) {
    let destinations: Vec<&str> = config
        .destinations
        .iter()
        .map(|destination| destination.name.as_str())
        .collect();

    info!(
        ?destinations,
        worker_count = config.workers.worker_count,
        queue_capacity = config.workers.queue_capacity,
        event_timeout_ms = config.workers.event_timeout_ms,
        redelivery_initial_delay_ms = config.redelivery.initial_delay_ms,
        redelivery_max_delay_ms = config.redelivery.max_delay_ms,
        input = ?config.io.input_path,
        output_dir = %config.io.output_dir.display(),
        dead_letter_path = %config.io.dead_letter_path.display(),
        "router configuration"
    );
}
