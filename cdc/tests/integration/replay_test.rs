use cdc::dead_letter::memory::MemoryDeadLetterSink;
use cdc::destination::jsonl::JsonLinesDestination;
use cdc::destination::memory::MemoryDestination;
use cdc::test_utils::event::envelope_bytes;
use cdc::test_utils::schema::sample_transformer;
use cdc::transport::memory::MemorySource;
use cdc::types::Operation;
use cdc::workers::pool::WorkerPool;
use cdc_config::shared::WorkerConfig;
use cdc_telemetry::init_test_tracing;
use serde_json::{Value, json};

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        worker_count: 3,
        queue_capacity: 4,
        event_timeout_ms: 5_000,
        dead_letter_alert_threshold: 10,
    }
}

fn customer_history() -> Vec<Vec<u8>> {
    vec![
        envelope_bytes(
            "customer",
            Operation::Insert,
            "0/10",
            json!({"id": 1, "email": "a@example.com", "name": "A"}),
        ),
        envelope_bytes(
            "customer",
            Operation::Update,
            "0/20",
            json!({"id": 1, "email": "a@example.com", "name": "B"}),
        ),
        envelope_bytes(
            "customer",
            Operation::Insert,
            "0/30",
            json!({"id": 2, "email": "two@example.com", "name": "Two"}),
        ),
        envelope_bytes("customer", Operation::Delete, "0/40", json!({"id": 2})),
        envelope_bytes(
            "customer",
            Operation::Insert,
            "1/0",
            json!({"id": 3, "email": "c@example.com", "name": "C"}),
        ),
        // Older than the insert above despite the larger low half.
        envelope_bytes(
            "customer",
            Operation::Update,
            "0/FFFFFFFF",
            json!({"id": 3, "email": "stale@example.com", "name": "Stale"}),
        ),
    ]
}

async fn run(stream: Vec<Vec<u8>>, destination: &MemoryDestination) {
    let pool = WorkerPool::start(
        &worker_config(),
        sample_transformer(),
        MemorySource::from_payloads(stream),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();
}

async fn merged_customers(destination: &MemoryDestination) -> Vec<Value> {
    destination
        .merged_rows("customer")
        .await
        .iter()
        .map(|record| record.to_json())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn merged_rows_reflect_the_latest_versions() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    run(customer_history(), &destination).await;

    assert_eq!(
        merged_customers(&destination).await,
        vec![
            json!({"id": 1, "email": "a@example.com", "name": "B", "is_deleted": 0, "lsn": 32}),
            json!({"id": 3, "email": "c@example.com", "name": "C", "is_deleted": 0, "lsn": 4294967296u64}),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn replaying_a_stream_converges_to_the_same_rows() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    run(customer_history(), &destination).await;
    let first = merged_customers(&destination).await;

    run(customer_history(), &destination).await;
    assert_eq!(destination.records().await.len(), 12);
    assert_eq!(merged_customers(&destination).await, first);

    let mut reversed = customer_history();
    reversed.reverse();
    let reordered = MemoryDestination::new();
    run(reversed, &reordered).await;

    let mut reordered_rows = merged_customers(&reordered).await;
    reordered_rows.sort_by_key(|row| row["id"].as_i64());
    assert_eq!(reordered_rows, first);
}

#[tokio::test(flavor = "multi_thread")]
async fn deletes_are_backfilled_in_the_output_file() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let destination = JsonLinesDestination::new(dir.path()).await.unwrap();
    let stream = vec![envelope_bytes(
        "customer",
        Operation::Delete,
        "0/1A2B3C4",
        json!({"id": 123}),
    )];

    let pool = WorkerPool::start(
        &worker_config(),
        sample_transformer(),
        MemorySource::from_payloads(stream),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();

    let contents = tokio::fs::read_to_string(destination.file_path("customer"))
        .await
        .unwrap();
    let lines: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(
        lines,
        vec![json!({"id": 123, "email": "", "name": "", "is_deleted": 1, "lsn": 27440068})]
    );
}
