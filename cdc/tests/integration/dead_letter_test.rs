use std::sync::Arc;

use cdc::dead_letter::jsonl::JsonLinesDeadLetterSink;
use cdc::dead_letter::memory::MemoryDeadLetterSink;
use cdc::destination::memory::MemoryDestination;
use cdc::error::ErrorKind;
use cdc::router::DestinationRouter;
use cdc::schema::TypeRegistry;
use cdc::test_utils::event::envelope_bytes;
use cdc::test_utils::schema::{customer_schema, sample_transformer};
use cdc::transformer::Transformer;
use cdc::transport::memory::MemorySource;
use cdc::types::Operation;
use cdc::workers::pool::WorkerPool;
use cdc_config::shared::WorkerConfig;
use cdc_telemetry::init_test_tracing;
use serde_json::{Value, json};

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        worker_count: 2,
        queue_capacity: 4,
        event_timeout_ms: 5_000,
        dead_letter_alert_threshold: 10,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn table_names_are_matched_exactly() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let dead_letters = JsonLinesDeadLetterSink::new(dir.path().join("dlq").join("dead_letters.jsonl"));
    let destination = MemoryDestination::new();

    let stream: Vec<Vec<u8>> = ["customer", "Customer", "CUSTOMER", "customers"]
        .into_iter()
        .map(|table| envelope_bytes(table, Operation::Insert, "0/1", json!({"id": 1})))
        .collect();

    let pool = WorkerPool::start(
        &worker_config(),
        sample_transformer(),
        MemorySource::from_payloads(stream),
        destination.clone(),
        dead_letters.clone(),
    );
    pool.wait().await.unwrap();

    assert_eq!(destination.records_for("customer").await.len(), 1);

    let contents = tokio::fs::read_to_string(dead_letters.path()).await.unwrap();
    let mut captured: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    captured.sort_by_key(|record| record["table"].as_str().map(str::to_owned));

    let reasons: Vec<&str> = captured
        .iter()
        .map(|record| record["reason"].as_str().unwrap())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "no destination registered for CUSTOMER",
            "no destination registered for Customer",
            "no destination registered for customers",
        ]
    );
    assert!(
        captured
            .iter()
            .all(|record| record["error_kind"] == json!("destination_not_registered"))
    );
    assert_eq!(
        captured[1]["envelope"]["metadata"]["table"],
        json!("Customer")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_letters_can_be_replayed_after_registration() {
    init_test_tracing();

    let customers_only = TypeRegistry::new(vec![customer_schema()]).unwrap();
    let transformer = Transformer::new(DestinationRouter::new(Arc::new(customers_only)));

    let stream = vec![
        envelope_bytes(
            "customer",
            Operation::Insert,
            "0/1",
            json!({"id": 1, "email": "a@example.com", "name": "A"}),
        ),
        envelope_bytes(
            "product",
            Operation::Insert,
            "0/2",
            json!({"id": 7, "name": "Lamp", "price": "19.99", "in_stock": "t"}),
        ),
    ];

    let destination = MemoryDestination::new();
    let dead_letters = MemoryDeadLetterSink::new();
    let pool = WorkerPool::start(
        &worker_config(),
        transformer,
        MemorySource::from_payloads(stream),
        destination.clone(),
        dead_letters.clone(),
    );
    pool.wait().await.unwrap();

    let captured = dead_letters.records().await;
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].error_kind, ErrorKind::DestinationNotRegistered);
    assert_eq!(captured[0].table.as_deref(), Some("product"));

    let replay: Vec<Vec<u8>> = captured
        .iter()
        .map(|record| record.original_bytes())
        .collect();
    let pool = WorkerPool::start(
        &worker_config(),
        sample_transformer(),
        MemorySource::from_payloads(replay),
        destination.clone(),
        MemoryDeadLetterSink::new(),
    );
    pool.wait().await.unwrap();

    let products = destination.merged_rows("product").await;
    assert_eq!(products.len(), 1);
    assert_eq!(
        products[0].to_json(),
        json!({
            "id": 7,
            "name": "Lamp",
            "price": "19.99",
            "in_stock": true,
            "created_at": "1970-01-01T00:00:00.000000Z",
            "is_deleted": 0,
            "lsn": 2
        })
    );
}
