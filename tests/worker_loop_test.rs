//! Integration tests for the worker loop and graceful shutdown
//!
//! These tests verify that:
//! - Items are processed in delivery order and counted
//! - The schema is bootstrapped exactly once
//! - Shutdown is honoured while waiting but never mid-treatment
//! - Only a `true` shutdown value abandons the pending dequeue
//! - Both handles are closed on every exit path

mod common;

use common::{payload, InMemoryQueue, InMemoryStore};
use doctor_worker::adapters::traits::BlockMode;
use doctor_worker::core::{Worker, WorkerSettings};
use doctor_worker::domain::{ConnectionError, PersistenceError, WorkerError};
use std::time::Duration;
use tokio::sync::watch;

fn settings(treatment_secs: u64) -> WorkerSettings {
    WorkerSettings {
        queue_name: "waiting_room".to_string(),
        block: BlockMode::Forever,
        treatment_time: Duration::from_secs(treatment_secs),
    }
}

#[tokio::test(start_paused = true)]
async fn test_processes_queue_in_order_until_drained() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::with_items([
        payload("p1", "Jane Doe", "flu", "2024-01-01T10:00:00Z"),
        payload("p2", "John Roe", "sprain", "2024-01-01T10:05:00Z"),
        payload("p3", "Ada Poe", "migraine", "2024-01-01T10:10:00Z"),
    ])
    .shutdown_when_drained(shutdown_tx);
    let store = InMemoryStore::new();

    let summary = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.patients_treated, 3);
    assert_eq!(summary.dequeued, 3);
    assert!(summary.interrupted);
    assert!(summary.duration >= Duration::from_secs(15));

    let ids: Vec<String> = store
        .committed()
        .into_iter()
        .map(|r| r.patient_id)
        .collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    assert_eq!(store.state().bootstraps, 1);
    assert!(store.state().closed);
    assert!(queue.state().closed);
}

#[tokio::test(start_paused = true)]
async fn test_failures_do_not_stop_the_loop() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::with_items([
        "{not json".to_string(),
        payload("p1", "Jane Doe", "flu", "2024-01-01T10:00:00Z"),
        payload("p2", "John Roe", "sprain", "not a timestamp"),
        payload(&"x".repeat(40), "Ada Poe", "migraine", "2024-01-01T10:10:00Z"),
        payload("p4", "Max Moe", "cough", "2024-01-01T10:15:00Z"),
    ])
    .shutdown_when_drained(shutdown_tx);
    let store = InMemoryStore::new();

    let summary = Worker::new(queue, store.clone(), settings(1))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.dequeued, 5);
    assert_eq!(summary.patients_treated, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(store.committed().len(), 2);
    assert!(!store.in_transaction());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_first_dequeue() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let queue = InMemoryQueue::with_items([payload("p1", "Jane Doe", "flu", "2024-01-01")]);
    let store = InMemoryStore::new();

    let summary = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.dequeued, 0);
    assert_eq!(queue.state().items.len(), 1);
    assert!(queue.state().closed);
    assert!(store.state().closed);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_waiting_on_empty_queue() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::default();
    let store = InMemoryStore::new();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown_tx.send(true).unwrap();
        // keep the sender alive past the send
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let summary = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.patients_treated, 0);
    assert!(summary.duration >= Duration::from_secs(30));
    assert!(queue.state().closed);
    assert!(store.state().closed);
}

#[tokio::test(start_paused = true)]
async fn test_false_shutdown_value_keeps_the_pending_dequeue() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::default();
    let store = InMemoryStore::new();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(false).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(false).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let summary = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert!(summary.duration >= Duration::from_secs(3));
    assert_eq!(queue.state().dequeue_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_never_interrupts_treatment() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::with_items([
        payload("p1", "Jane Doe", "flu", "2024-01-01T10:00:00Z"),
        payload("p2", "John Roe", "sprain", "2024-01-01T10:05:00Z"),
    ]);
    let store = InMemoryStore::new();

    // arrives one second into the first five-second treatment
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let summary = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.patients_treated, 1);
    assert_eq!(store.committed().len(), 1);
    assert_eq!(queue.state().items.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_shutdown_sender_stops_the_loop() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    let store = InMemoryStore::new();
    let summary = Worker::new(InMemoryQueue::default(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert!(store.state().closed);
}

#[tokio::test(start_paused = true)]
async fn test_polling_mode_keeps_waiting_until_shutdown() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::default();
    let worker_settings = WorkerSettings {
        block: BlockMode::Timeout(Duration::from_secs(1)),
        ..settings(0)
    };

    let worker = Worker::new(queue.clone(), InMemoryStore::new(), worker_settings);
    let handle = tokio::spawn(worker.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(4500)).await;
    queue
        .state()
        .items
        .push_back(payload("p1", "Jane Doe", "flu", "2024-01-01T10:00:00Z"));
    tokio::time::sleep(Duration::from_secs(3)).await;
    shutdown_tx.send(true).unwrap();

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.patients_treated, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lost_queue_connection_is_fatal_and_closes_handles() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::default();
    queue.state().lost = true;
    let store = InMemoryStore::new();

    let result = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await;

    match result {
        Err(WorkerError::Connection(ConnectionError::Lost { service, .. })) => {
            assert_eq!(service, "Redis")
        }
        other => panic!("expected lost connection, got {other:?}"),
    }
    assert!(queue.state().closed);
    assert!(store.state().closed);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_failure_stops_before_dequeue() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = InMemoryQueue::with_items([payload("p1", "Jane Doe", "flu", "2024-01-01")]);
    let store = InMemoryStore::new();
    store.state().fail_bootstrap = true;

    let result = Worker::new(queue.clone(), store.clone(), settings(5))
        .run(shutdown_rx)
        .await;

    assert!(matches!(
        result,
        Err(WorkerError::Persistence(PersistenceError::Schema(_)))
    ));
    assert_eq!(queue.state().dequeued, 0);
    assert!(queue.state().closed);
    assert!(store.state().closed);
}
