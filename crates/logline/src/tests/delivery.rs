//! Delivery cycle tests.
//!
//! Rules covered:
//! - A `Delivered` batch is deleted with exactly one `delete_by_ids` call
//! - A cycle loads at most `batch_size` records, oldest first
//! - A `Deferred` batch is kept and reloaded unchanged on the next cycle

use super::harness::{config, next_cycle, settle, ClickLog, ObserverLog, RecordingSender, RecordingStore};
use crate::pipeline::Pipeline;
use crate::types::{DeliveryOutcome, DestinationId, RecordId};

/// Scenario A: three events, one cycle, one batch of three, empty store.
#[tokio::test(start_paused = true)]
async fn delivered_batch_empties_store() {
    let store = RecordingStore::new();
    let sender = RecordingSender::delivering();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    for i in 0..3 {
        pipeline.send(&ClickLog { id: i }).unwrap();
    }
    next_cycle().await;

    assert_eq!(store.len(), 0);
    assert_eq!(sender.call_count(), 1);
    assert_eq!(sender.batches()[0].len(), 3);
}

/// A successful batch is followed by exactly one delete covering exactly
/// its ids, never more.
#[tokio::test(start_paused = true)]
async fn delivered_batch_is_deleted_once_by_exact_ids() {
    let store = RecordingStore::new();
    let sender = RecordingSender::delivering();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    for i in 0..4 {
        pipeline.send(&ClickLog { id: i }).unwrap();
    }
    settle().await;
    let persisted: Vec<RecordId> = store.records().iter().map(|r| r.id).collect();

    next_cycle().await;
    next_cycle().await;

    assert_eq!(store.deletes(), vec![persisted.clone()]);
    assert_eq!(sender.delivered_ids(), persisted);
}

/// Scenario C: batch size 5, 100 events, one cycle delivers the oldest 5.
#[tokio::test(start_paused = true)]
async fn batch_size_caps_each_cycle() {
    let store = RecordingStore::new();
    let sender = RecordingSender::delivering();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .batch_size(5)
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    for i in 0..100 {
        pipeline.send(&ClickLog { id: i }).unwrap();
    }
    settle().await;
    let oldest: Vec<RecordId> = store.records().iter().take(5).map(|r| r.id).collect();

    next_cycle().await;

    assert_eq!(store.len(), 95);
    assert_eq!(sender.call_count(), 1);
    assert_eq!(sender.delivered_ids(), oldest);

    next_cycle().await;
    assert_eq!(store.len(), 90);
}

/// Scenario B: a backend that always defers keeps the store size constant.
#[tokio::test(start_paused = true)]
async fn deferred_batches_stay_in_store() {
    let store = RecordingStore::new();
    let sender = RecordingSender::answering(DeliveryOutcome::Deferred);
    let log = ObserverLog::new();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .observer(log.observer())
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    for i in 0..3 {
        pipeline.send(&ClickLog { id: i }).unwrap();
    }

    for _ in 0..5 {
        next_cycle().await;
        assert_eq!(store.len(), 3);
    }

    assert!(store.deletes().is_empty(), "deferred batches are never deleted");
    assert_eq!(sender.call_count(), 5);

    let outcomes = log.last_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, DeliveryOutcome::Deferred);
    assert_eq!(outcomes[0].record_count, 3);
}

/// Deferred records come back in the next cycle with the same ids.
#[tokio::test(start_paused = true)]
async fn deferred_records_reappear_unchanged() {
    let store = RecordingStore::new();
    let sender = RecordingSender::delivering();
    sender.queue_reply(super::harness::Reply::Outcome(DeliveryOutcome::Deferred));
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    for i in 0..3 {
        pipeline.send(&ClickLog { id: i }).unwrap();
    }
    next_cycle().await;
    next_cycle().await;

    let batches = sender.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1], "the same records are redelivered");
    assert_eq!(store.len(), 0);
    assert_eq!(store.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_batch_is_dropped() {
    let store = RecordingStore::new();
    let sender = RecordingSender::answering(DeliveryOutcome::Rejected);
    let log = ObserverLog::new();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .observer(log.observer())
                .build()
                .unwrap(),
        )
        .unwrap();
    settle().await;

    pipeline.send(&ClickLog { id: 1 }).unwrap();
    next_cycle().await;
    next_cycle().await;

    assert_eq!(store.len(), 0);
    assert_eq!(store.deletes().len(), 1);
    assert_eq!(sender.call_count(), 1, "rejected records are never retried");

    let outcomes = log.last_outcomes();
    assert_eq!(outcomes[0].destination, DestinationId::from("a"));
    assert_eq!(outcomes[0].outcome, DeliveryOutcome::Rejected);
}

#[tokio::test(start_paused = true)]
async fn empty_store_skips_senders() {
    let store = RecordingStore::new();
    let sender = RecordingSender::delivering();
    let log = ObserverLog::new();
    let pipeline = Pipeline::new();
    pipeline
        .start(
            config(store.clone())
                .destination("a", sender.clone(), ["click"])
                .observer(log.observer())
                .build()
                .unwrap(),
        )
        .unwrap();

    settle().await;
    next_cycle().await;
    next_cycle().await;

    assert_eq!(sender.call_count(), 0);
    assert_eq!(store.load_count(), 3);
    assert!(log.cycles().iter().all(|outcomes| outcomes.is_empty()));
}
