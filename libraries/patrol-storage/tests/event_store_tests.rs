//! Integration tests for the durable event store


use patrol_core::{CheckpointPayload, ItemKind, QueueId, ScanLogPayload};
use patrol_storage::StorageError;
use proptest::prelude::*;
use test_helpers::{checkpoint_json, TestDb};

#[tokio::test]
async fn test_enqueue_assigns_increasing_ids() {
    let db = TestDb::new();
    let store = db.open().await;

    let a = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    let b = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c2")).await.unwrap();

    assert!(b > a);
    assert_eq!(store.count(), 2);
}

#[tokio::test]
async fn test_list_preserves_insertion_order() {
    let db = TestDb::new();
    let store = db.open().await;

    let first = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    let second = store
        .enqueue_payload(&ScanLogPayload::new("patrol-1", "04:AA", "door_open"))
        .await
        .unwrap();
    let third = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c3")).await.unwrap();

    let items = store.list().await.unwrap();
    let ids: Vec<QueueId> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![first, second, third]);

    assert_eq!(items[1].kind, ItemKind::ScanLog);
    assert_eq!(items[0].attempts, 0);
    assert!(items[0].last_error.is_none());
}

#[tokio::test]
async fn test_enqueue_payload_round_trips_typed_record() {
    let db = TestDb::new();
    let store = db.open().await;

    let payload = CheckpointPayload::new("patrol-9", "zone-c", "cp-4", "04:01:02");
    let id = store.enqueue_payload(&payload).await.unwrap();

    let item = store.get(id).await.unwrap().expect("item should exist");
    assert_eq!(item.kind, ItemKind::Checkpoint);
    assert_eq!(item.decode::<CheckpointPayload>().unwrap(), payload);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let db = TestDb::new();
    let store = db.open().await;

    let id = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();

    assert!(store.remove(id).await.unwrap());
    assert!(!store.remove(id).await.unwrap());
    assert!(!store.remove(QueueId::new(9999)).await.unwrap());
    assert_eq!(store.count(), 0);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ids_not_reused_after_deletion() {
    let db = TestDb::new();
    let store = db.open().await;

    let a = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    store.remove(a).await.unwrap();
    let b = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c2")).await.unwrap();

    assert_ne!(a, b);
    assert!(b > a);
}

#[tokio::test]
async fn test_items_survive_reopen() {
    let db = TestDb::new();

    let ids = {
        let store = db.open().await;
        let mut ids = Vec::new();
        for n in 0..3 {
            ids.push(
                store
                    .enqueue(ItemKind::Checkpoint, checkpoint_json(&format!("c{n}")))
                    .await
                    .unwrap(),
            );
        }
        store.close().await;
        ids
    };

    // Simulated process restart
    let store = db.open().await;
    assert_eq!(store.count(), 3);

    let items = store.list().await.unwrap();
    let reloaded: Vec<QueueId> = items.iter().map(|i| i.id).collect();
    assert_eq!(reloaded, ids);
    assert_eq!(items[2].payload["checkpointId"], "c2");
}

#[tokio::test]
async fn test_mark_failed_increments_attempts() {
    let db = TestDb::new();
    let store = db.open().await;

    let id = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();

    assert_eq!(store.mark_failed(id, "connection reset").await.unwrap(), Some(1));
    assert_eq!(store.mark_failed(id, "503").await.unwrap(), Some(2));

    let item = store.get(id).await.unwrap().unwrap();
    assert_eq!(item.attempts, 2);
    assert_eq!(item.last_error.as_deref(), Some("503"));
    // Failing does not take the item out of the queue
    assert_eq!(store.count(), 1);

    assert_eq!(store.mark_failed(QueueId::new(404), "gone").await.unwrap(), None);
}

#[tokio::test]
async fn test_dead_letter_leaves_rotation() {
    let db = TestDb::new();
    let store = db.open().await;

    let bad = store.enqueue(ItemKind::Checkpoint, checkpoint_json("bad")).await.unwrap();
    let good = store.enqueue(ItemKind::Checkpoint, checkpoint_json("good")).await.unwrap();

    assert!(store.dead_letter(bad, "422 unknown checkpoint").await.unwrap());
    assert!(!store.dead_letter(bad, "again").await.unwrap());

    assert_eq!(store.count(), 1);
    assert_eq!(store.list().await.unwrap()[0].id, good);

    let dead = store.dead_letters().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert!(dead[0].is_dead_lettered());
    assert_eq!(dead[0].last_error.as_deref(), Some("422 unknown checkpoint"));
    assert_eq!(store.dead_letter_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_requeue_restores_fifo_position() {
    let db = TestDb::new();
    let store = db.open().await;

    let first = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    let second = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c2")).await.unwrap();

    store.mark_failed(first, "422").await.unwrap();
    store.dead_letter(first, "422").await.unwrap();
    store.requeue(first).await.unwrap();

    let items = store.list().await.unwrap();
    assert_eq!(items[0].id, first);
    assert_eq!(items[1].id, second);
    // attempts are never reset by requeue
    assert_eq!(items[0].attempts, 1);
    assert_eq!(store.count(), 2);

    let err = store.requeue(second).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_purge_dead_letter_keeps_active_count() {
    let db = TestDb::new();
    let store = db.open().await;

    let dead = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    store.enqueue(ItemKind::Checkpoint, checkpoint_json("c2")).await.unwrap();
    store.dead_letter(dead, "bad tag").await.unwrap();

    assert!(store.purge(dead).await.unwrap());
    assert_eq!(store.count(), 1);
    assert_eq!(store.dead_letter_count().await.unwrap(), 0);
    assert!(store.get(dead).await.unwrap().is_none());
}

#[tokio::test]
async fn test_watch_count_follows_mutations() {
    let db = TestDb::new();
    let store = db.open().await;
    let badge = store.watch_count();

    let id = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    assert_eq!(*badge.borrow(), 1);

    store.remove(id).await.unwrap();
    assert_eq!(*badge.borrow(), 0);
}

#[tokio::test]
async fn test_refresh_count_matches_database() {
    let db = TestDb::new();
    let store = db.open().await;

    store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    // Another handle on the same file writes behind this store's back
    let other = db.open().await;
    other.enqueue(ItemKind::Checkpoint, checkpoint_json("c2")).await.unwrap();

    assert_eq!(store.count(), 1);
    assert_eq!(store.refresh_count().await.unwrap(), 2);
    assert_eq!(store.count(), 2);
}

#[tokio::test]
async fn test_unreadable_rows_are_dead_lettered_not_fatal() {
    let db = TestDb::new();
    let store = db.open().await;

    let good = store.enqueue(ItemKind::Checkpoint, checkpoint_json("c1")).await.unwrap();
    // A kind this build does not know and a timestamp out of range
    sqlx::query("INSERT INTO pending_events (kind, payload, created_at, attempts) VALUES ('photo', '{}', 0, 0)")
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO pending_events (kind, payload, created_at, attempts) VALUES ('checkpoint', '{}', ?, 0)")
        .bind(i64::MAX)
        .execute(store.pool())
        .await
        .unwrap();
    assert_eq!(store.refresh_count().await.unwrap(), 3);

    let listed: Vec<QueueId> = store.list().await.unwrap().iter().map(|i| i.id).collect();
    assert_eq!(listed, vec![good]);
    assert_eq!(store.count(), 1);
    assert_eq!(store.dead_letter_count().await.unwrap(), 2);

    // Listing again is clean, and the quarantined rows can still be purged
    assert_eq!(store.list().await.unwrap().len(), 1);
    assert!(store.dead_letters().await.unwrap().is_empty());
    assert!(store.purge(QueueId::new(2)).await.unwrap());
    assert_eq!(store.dead_letter_count().await.unwrap(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Property: list() always returns active items in enqueue order, whatever
    /// subset has been removed.
    #[test]
    fn list_is_fifo_after_arbitrary_removals(removals in prop::collection::vec(any::<bool>(), 1..15)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let db = TestDb::new();
            let store = db.open().await;

            let mut expected = Vec::new();
            for (n, remove) in removals.iter().enumerate() {
                let id = store
                    .enqueue(ItemKind::Checkpoint, checkpoint_json(&format!("c{n}")))
                    .await
                    .unwrap();
                if *remove {
                    store.remove(id).await.unwrap();
                } else {
                    expected.push(id);
                }
            }

            let listed: Vec<QueueId> = store.list().await.unwrap().iter().map(|i| i.id).collect();
            assert_eq!(listed, expected);
            assert_eq!(store.count(), expected.len());
        });
    }
}
