use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::{Duration, Instant};

use cdc_config::shared::WorkerConfig;
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::cdc_error;
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::dead_letter::DeadLetterSink;
use crate::destination::Destination;
use crate::error::{CdcResult, ErrorKind};
use crate::metrics::{
    CDC_EVENT_PROCESSING_DURATION_SECONDS, CDC_EVENT_TIMEOUTS_TOTAL, register_metrics,
};
use crate::transformer::Transformer;
use crate::transport::{Acknowledger, Delivery, EventSource};
use crate::types::peek_table;
use crate::workers::processor::{EventProcessor, Outcome};

/// Reason attached to deliveries handed back because shutdown interrupted their dispatch.
const SHUTDOWN_NACK_REASON: &str = "shutdown requested";

/// Reason attached to deliveries whose processing exceeded the event timeout.
const TIMEOUT_NACK_REASON: &str = "event processing timed out";

/// Returns the worker responsible for `delivery`.
///
/// All events of a table land on the same worker, which keeps their relative order. Deliveries
/// whose table cannot be read go to the first worker, where they end up as dead letters.
fn partition(delivery: &Delivery, workers: usize) -> usize {
    let Some(table) = peek_table(&delivery.payload) else {
        return 0;
    };

    let mut hasher = DefaultHasher::new();
    table.hash(&mut hasher);

    (hasher.finish() % workers as u64) as usize
}

/// Pool of workers consuming one event source.
///
/// An intake task receives deliveries and dispatches each one into the bounded queue of its
/// worker. A full queue suspends the intake, so the source is never read faster than the
/// destination accepts records. Deliveries are acked only after their record or dead letter is
/// stored and nacked on write failures and timeouts.
#[derive(Debug)]
pub struct WorkerPool<D, L> {
    join_set: JoinSet<CdcResult<()>>,
    processor: EventProcessor<D, L>,
    shutdown_tx: ShutdownTx,
}

impl<D, L> WorkerPool<D, L>
where
    D: Destination + Clone + Send + Sync + 'static,
    L: DeadLetterSink + Clone + Send + Sync + 'static,
{
    /// Starts the intake and `config.worker_count` workers.
    pub fn start<S>(
        config: &WorkerConfig,
        transformer: Transformer,
        source: S,
        destination: D,
        dead_letters: L,
    ) -> Self
    where
        S: EventSource + Send + 'static,
    {
        register_metrics();

        let processor = EventProcessor::new(transformer, destination, dead_letters);
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let acknowledger = source.acknowledger();
        let event_timeout = Duration::from_millis(config.event_timeout_ms);
        let worker_count = usize::from(config.worker_count.max(1));

        let mut join_set = JoinSet::new();
        let mut senders = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
            senders.push(tx);

            let worker = Worker {
                id: worker_id,
                processor: processor.clone(),
                acknowledger: acknowledger.clone(),
                event_timeout,
                dead_letter_alert_threshold: config.dead_letter_alert_threshold,
            };
            join_set.spawn(worker.run(rx));
        }

        join_set.spawn(run_intake(source, senders, shutdown_rx));

        info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            event_timeout_ms = config.event_timeout_ms,
            "worker pool started"
        );

        Self {
            join_set,
            processor,
            shutdown_tx,
        }
    }

    /// Returns a handle that requests shutdown of this pool.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Stops reading from the source. Queued deliveries are still processed.
    pub fn shutdown(&self) {
        info!("shutting down worker pool");

        if self.shutdown_tx.shutdown().is_err() {
            debug!("intake already stopped");
        }
    }

    /// Waits until the intake and all workers stopped, then shuts down both sinks.
    ///
    /// The first failing task triggers a shutdown of the remaining ones. All errors are
    /// aggregated.
    pub async fn wait(mut self) -> CdcResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(error = %err, "worker pool task failed");
                    errors.push(err);
                    let _ = self.shutdown_tx.shutdown();
                }
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("worker pool task was cancelled");
                    } else {
                        errors.push(cdc_error!(
                            ErrorKind::WorkerPanic,
                            "Worker task panicked",
                            join_err,
                            source: join_err
                        ));
                        let _ = self.shutdown_tx.shutdown();
                    }
                }
            }
        }

        if let Err(err) = self.processor.shutdown().await {
            errors.push(err);
        }

        info!("worker pool stopped");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

/// Pulls deliveries from `source` and dispatches them until the source is exhausted or
/// shutdown is requested. Dropping the senders on return lets workers drain and stop.
async fn run_intake<S>(
    mut source: S,
    senders: Vec<mpsc::Sender<Delivery>>,
    mut shutdown_rx: ShutdownRx,
) -> CdcResult<()>
where
    S: EventSource,
{
    let acknowledger = source.acknowledger();

    loop {
        let received = tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                info!("shutdown requested, stopping intake");
                break;
            }
            received = source.receive() => received?,
        };

        let Some(delivery) = received else {
            info!("event source exhausted, stopping intake");
            break;
        };

        let id = delivery.id;
        let worker_id = partition(&delivery, senders.len());

        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                acknowledger.nack(id, SHUTDOWN_NACK_REASON).await?;
                info!("shutdown requested, stopping intake");
                break;
            }
            sent = senders[worker_id].send(delivery) => {
                if sent.is_err() {
                    acknowledger.nack(id, "worker stopped").await?;
                    return Err(cdc_error!(
                        ErrorKind::InvalidState,
                        "Worker stopped while the intake was running",
                        worker_id
                    ));
                }
            }
        }
    }

    Ok(())
}

struct Worker<D, L, A> {
    id: usize,
    processor: EventProcessor<D, L>,
    acknowledger: A,
    event_timeout: Duration,
    dead_letter_alert_threshold: u32,
}

impl<D, L, A> Worker<D, L, A>
where
    D: Destination,
    L: DeadLetterSink,
    A: Acknowledger,
{
    async fn run(self, mut rx: mpsc::Receiver<Delivery>) -> CdcResult<()> {
        let mut consecutive_dead_letter_failures: u32 = 0;

        while let Some(delivery) = rx.recv().await {
            let started = Instant::now();
            let result = timeout(self.event_timeout, self.processor.process(&delivery)).await;
            histogram!(CDC_EVENT_PROCESSING_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(Ok(outcome)) => {
                    match outcome {
                        Outcome::DeadLetterFailed => {
                            consecutive_dead_letter_failures += 1;
                            self.alert_on_dead_letter_failures(consecutive_dead_letter_failures);
                        }
                        Outcome::DeadLettered => consecutive_dead_letter_failures = 0,
                        Outcome::Written => {}
                    }

                    self.acknowledger.ack(delivery.id).await?;
                }
                Ok(Err(err)) => {
                    warn!(
                        worker_id = self.id,
                        delivery_id = delivery.id,
                        redeliveries = delivery.redeliveries,
                        error = %err,
                        "event processing failed, handing it back for redelivery"
                    );
                    self.acknowledger
                        .nack(delivery.id, err.kind().as_str())
                        .await?;
                }
                Err(_) => {
                    warn!(
                        worker_id = self.id,
                        delivery_id = delivery.id,
                        timeout_ms = self.event_timeout.as_millis() as u64,
                        "event processing timed out, handing it back for redelivery"
                    );
                    counter!(CDC_EVENT_TIMEOUTS_TOTAL).increment(1);
                    self.acknowledger
                        .nack(delivery.id, TIMEOUT_NACK_REASON)
                        .await?;
                }
            }
        }

        debug!(worker_id = self.id, "worker stopped");

        Ok(())
    }

    fn alert_on_dead_letter_failures(&self, consecutive: u32) {
        let threshold = self.dead_letter_alert_threshold;
        if threshold > 0 && consecutive % threshold == 0 {
            error!(
                worker_id = self.id,
                consecutive_failures = consecutive,
                alert = "dead_letter_sink_failing",
                "dead letter sink keeps failing, events are being dropped"
            );
        }
    }
}
