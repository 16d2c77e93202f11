use std::time::Duration;

use cdc::dead_letter::memory::MemoryDeadLetterSink;
use cdc::destination::memory::MemoryDestination;
use cdc::test_utils::event::{customer_inserts, envelope_bytes};
use cdc::test_utils::faulty::{FailingDeadLetterSink, FaultyDestination};
use cdc::test_utils::notify::wait_until;
use cdc::test_utils::schema::sample_transformer;
use cdc::transport::memory::MemorySource;
use cdc::types::Operation;
use cdc::workers::pool::WorkerPool;
use cdc_config::shared::{RedeliveryConfig, WorkerConfig};
use cdc_telemetry::init_test_tracing;
use serde_json::json;

fn worker_config(worker_count: u16, queue_capacity: usize) -> WorkerConfig {
    WorkerConfig {
        worker_count,
        queue_capacity,
        event_timeout_ms: 5_000,
        dead_letter_alert_threshold: 3,
    }
}

/// Builds a stream over all sample destinations followed by events that must be dead lettered.
fn mixed_stream() -> (Vec<Vec<u8>>, usize) {
    let mut stream = Vec::new();

    for id in 1..=25u64 {
        let lsn = format!("0/{:X}", id * 4);
        stream.push(envelope_bytes(
            "customer",
            Operation::Insert,
            &lsn,
            json!({"id": id, "email": format!("c{id}@example.com"), "name": "c"}),
        ));
        stream.push(envelope_bytes(
            "product",
            Operation::Read,
            &lsn,
            json!({"id": id, "name": "p", "price": "1.25", "in_stock": true}),
        ));
        stream.push(envelope_bytes(
            "order",
            Operation::Update,
            &lsn,
            json!({"id": id, "customer_id": id, "total": 10.5, "placed_at": "2024-03-01T10:00:00Z"}),
        ));
        stream.push(envelope_bytes(
            "orderitem",
            Operation::Insert,
            &lsn,
            json!({"order_id": id, "product_id": id, "quantity": 2, "unit_price": "5.25"}),
        ));
    }
    let routable = stream.len();

    stream.push(envelope_bytes(
        "Customer",
        Operation::Insert,
        "0/1",
        json!({"id": 1}),
    ));
    stream.push(envelope_bytes(
        "customer",
        Operation::Insert,
        "16B3748",
        json!({"id": 1}),
    ));
    stream.push(envelope_bytes(
        "product",
        Operation::Insert,
        "0/2",
        json!({"id": "abc"}),
    ));
    stream.push(b"{not json".to_vec());

    (stream, routable)
}

#[tokio::test(flavor = "multi_thread")]
async fn every_event_is_written_or_dead_lettered() {
    init_test_tracing();

    let (stream, routable) = mixed_stream();
    let total = stream.len();

    let source = MemorySource::from_payloads(stream);
    let destination = MemoryDestination::new();
    let dead_letters = MemoryDeadLetterSink::new();

    let pool = WorkerPool::start(
        &worker_config(4, 8),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        dead_letters.clone(),
    );
    pool.wait().await.unwrap();

    let records = destination.records().await;
    let captured = dead_letters.records().await;
    assert_eq!(records.len(), routable);
    assert_eq!(captured.len(), total - routable);

    let mut acked = source.tracker().acked();
    acked.sort_unstable();
    assert_eq!(acked, (0..total as u64).collect::<Vec<_>>());
    assert!(source.tracker().nacked().is_empty());

    for destination_name in ["customer", "product", "order", "orderitem"] {
        assert_eq!(destination.merged_rows(destination_name).await.len(), 25);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_writes_are_redelivered() {
    init_test_tracing();

    let source = MemorySource::from_payloads(customer_inserts(10));
    let destination = FaultyDestination::failing(3);

    let pool = WorkerPool::start(
        &worker_config(1, 4),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();

    assert_eq!(destination.attempts(), 13);
    assert_eq!(destination.memory().records().await.len(), 10);
    assert_eq!(destination.memory().merged_rows("customer").await.len(), 10);

    let nacked = source.tracker().nacked();
    assert_eq!(nacked.len(), 3);
    assert!(
        nacked
            .iter()
            .all(|(_, reason)| reason == "destination_write_failed")
    );
    assert_eq!(source.tracker().acked().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn redeliveries_back_off() {
    init_test_tracing();

    let redelivery = RedeliveryConfig {
        initial_delay_ms: 100,
        max_delay_ms: 1_000,
        backoff_multiplier: 2.0,
    };
    let source = MemorySource::from_payloads(customer_inserts(1)).with_redelivery(redelivery);
    let destination = FaultyDestination::failing(4);

    let started = tokio::time::Instant::now();
    let pool = WorkerPool::start(
        &worker_config(1, 4),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();

    // Four nacks wait 100, 200, 400 and 800ms before the fifth attempt succeeds.
    assert_eq!(destination.attempts(), 5);
    assert_eq!(source.tracker().nacked_total(), 4);
    assert_eq!(source.tracker().acked(), vec![0]);
    assert!(started.elapsed() >= Duration::from_millis(1_500));
    assert_eq!(destination.memory().records().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_events_are_redelivered() {
    init_test_tracing();

    let source = MemorySource::from_payloads(customer_inserts(3));
    let destination = FaultyDestination::stalling(1, Duration::from_secs(60));
    let config = WorkerConfig {
        event_timeout_ms: 100,
        ..worker_config(1, 4)
    };

    let pool = WorkerPool::start(
        &config,
        sample_transformer(),
        source.clone(),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();

    assert_eq!(destination.attempts(), 4);
    assert_eq!(destination.memory().merged_rows("customer").await.len(), 3);
    assert_eq!(
        source.tracker().nacked(),
        vec![(0, "event processing timed out".to_owned())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn full_queues_stop_the_intake() {
    init_test_tracing();

    let source = MemorySource::from_payloads(customer_inserts(20));
    let destination = FaultyDestination::gated();

    let pool = WorkerPool::start(
        &worker_config(1, 2),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );

    // One event is being written, two are queued and one waits in the intake.
    let pending_source = source.clone();
    wait_until(|| {
        let source = pending_source.clone();
        async move { source.pending().await == 16 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.pending().await, 16);
    assert_eq!(destination.attempts(), 1);
    assert!(destination.memory().records().await.is_empty());

    destination.release(20);
    pool.wait().await.unwrap();

    assert_eq!(source.pending().await, 0);
    assert_eq!(destination.memory().records().await.len(), 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_intake_after_draining() {
    init_test_tracing();

    let source = MemorySource::new();
    for payload in customer_inserts(5) {
        source.push(payload).await;
    }
    let destination = MemoryDestination::new();

    let pool = WorkerPool::start(
        &worker_config(2, 4),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );

    let written = destination.clone();
    wait_until(|| {
        let destination = written.clone();
        async move { destination.records().await.len() == 5 }
    })
    .await;

    let shutdown_tx = pool.shutdown_tx();
    shutdown_tx.shutdown().unwrap();
    pool.wait().await.unwrap();

    source.push(customer_inserts(1).remove(0)).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(source.pending().await, 1);
    assert_eq!(destination.records().await.len(), 5);
    assert_eq!(source.tracker().acked().len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_dead_letter_sink_does_not_stall_the_stream() {
    init_test_tracing();

    let mut stream = customer_inserts(5);
    for id in 0..5 {
        stream.push(envelope_bytes(
            "customers",
            Operation::Insert,
            "0/1",
            json!({"id": id}),
        ));
    }

    let source = MemorySource::from_payloads(stream);
    let destination = MemoryDestination::new();
    let dead_letters = FailingDeadLetterSink::new();

    let pool = WorkerPool::start(
        &worker_config(2, 4),
        sample_transformer(),
        source.clone(),
        destination.clone(),
        dead_letters.clone(),
    );
    pool.wait().await.unwrap();

    assert_eq!(dead_letters.attempts(), 5);
    assert_eq!(destination.records().await.len(), 5);
    assert_eq!(source.tracker().acked().len(), 10);
    assert!(source.tracker().nacked().is_empty());
}
